mod common;

use common::TestServer;
use superchat_proto::payload::{ChannelType, CreateChannel, JoinChannel, PostMessage, SubscribeChannel};
use superchat_proto::Payload;

#[tokio::test]
async fn anonymous_post_broadcasts_to_subscribed_peer() -> anyhow::Result<()> {
    let server = TestServer::spawn(28081).await?;

    let mut alice = server.connect().await?;
    alice.handshake("alice").await?;
    let mut bob = server.connect().await?;
    bob.handshake("bob").await?;

    alice
        .send(Payload::CreateChannel(CreateChannel {
            name: "general".to_string(),
            display_name: "General".to_string(),
            description: None,
            channel_type: ChannelType::Chat,
            retention_hours: None,
            message_limit: None,
        }))
        .await?;
    let created = alice.recv().await?;
    let channel_id = match created {
        Payload::ChannelCreated(c) if c.success => c.channel.unwrap().channel_id,
        other => anyhow::bail!("unexpected create response: {other:?}"),
    };

    // bob also gets pushed the broadcast CHANNEL_CREATED, then subscribes.
    bob.recv().await?;
    bob.send(Payload::JoinChannel(JoinChannel {
        name: "general".to_string(),
    }))
    .await?;
    bob.recv().await?;
    bob.send(Payload::SubscribeChannel(SubscribeChannel {
        channel_id,
        subchannel_id: None,
    }))
    .await?;
    bob.recv().await?;

    alice
        .send(Payload::PostMessage(PostMessage {
            channel_id,
            subchannel_id: None,
            parent_id: None,
            content: "hello there".to_string(),
        }))
        .await?;

    match alice.recv().await? {
        Payload::MessagePosted(ack) => assert!(ack.success),
        other => anyhow::bail!("expected MESSAGE_POSTED, got {other:?}"),
    }

    let pushed = bob
        .recv_until(|p| matches!(p, Payload::NewMessage(_)))
        .await?;
    match pushed {
        Payload::NewMessage(n) => {
            assert_eq!(n.message.content, "hello there");
            assert_eq!(n.message.author_nickname, "~alice");
        }
        _ => unreachable!(),
    }

    Ok(())
}

#[tokio::test]
async fn posting_without_a_nickname_is_rejected() -> anyhow::Result<()> {
    let server = TestServer::spawn(28082).await?;
    let mut client = server.connect().await?;
    client.recv().await?; // SERVER_CONFIG

    client
        .send(Payload::PostMessage(PostMessage {
            channel_id: 1,
            subchannel_id: None,
            parent_id: None,
            content: "nope".to_string(),
        }))
        .await?;

    match client.recv().await? {
        Payload::Error(e) => {
            assert_eq!(e.code, superchat_proto::payload::WireErrorCode::NotAuthenticated)
        }
        other => anyhow::bail!("expected ERROR, got {other:?}"),
    }
    Ok(())
}
