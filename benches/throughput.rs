use bytes::BytesMut;
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use superchat_proto::payload::{MessageSummary, NewMessage, PostMessage};
use superchat_proto::{decode_payload, Frame, MessageType, Payload, SuperChatCodec};
use tokio_util::codec::{Decoder, Encoder};

fn frame_encode_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");
    group.throughput(Throughput::Elements(1));

    group.bench_function("encode_post_message", |b| {
        b.iter(|| {
            Payload::PostMessage(PostMessage {
                channel_id: 7,
                subchannel_id: None,
                parent_id: None,
                content: "hello world".to_string(),
            })
            .into_frame()
        })
    });

    group.finish();
}

fn codec_round_trip_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let frame = Payload::NewMessage(NewMessage {
        message: MessageSummary {
            message_id: 42,
            channel_id: 7,
            subchannel_id: None,
            parent_id: None,
            author_user_id: Some(1),
            author_nickname: "alice".to_string(),
            content: "hello world, this is a sample chat message".to_string(),
            created_at: 1_700_000_000_000,
            edited_at: None,
            deleted_at: None,
        },
    })
    .into_frame();

    let mut encoded = BytesMut::new();
    SuperChatCodec::default().encode(frame.clone(), &mut encoded).unwrap();
    group.throughput(Throughput::Bytes(encoded.len() as u64));

    group.bench_function("decode_new_message", |b| {
        b.iter(|| {
            let mut buf = encoded.clone();
            let decoded: Frame = SuperChatCodec::default().decode(&mut buf).unwrap().unwrap();
            decode_payload(MessageType::NewMessage, &decoded.payload).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, frame_encode_benchmark, codec_round_trip_benchmark);
criterion_main!(benches);
