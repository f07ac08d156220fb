mod common;

use common::TestServer;
use superchat_proto::payload::{AuthRequest, RegisterUser, SetNickname};
use superchat_proto::Payload;

#[tokio::test]
async fn register_then_reauthenticate() -> anyhow::Result<()> {
    let server = TestServer::spawn(28083).await?;

    let mut client = server.connect().await?;
    client.recv().await?; // SERVER_CONFIG
    client
        .send(Payload::SetNickname(SetNickname {
            nickname: "carol".to_string(),
        }))
        .await?;
    match client.recv().await? {
        Payload::NicknameResponse(r) => assert!(r.success),
        other => anyhow::bail!("unexpected reply: {other:?}"),
    }

    client
        .send(Payload::RegisterUser(RegisterUser {
            password: "short".to_string(),
        }))
        .await?;
    match client.recv().await? {
        Payload::Error(e) => assert_eq!(e.code, superchat_proto::payload::WireErrorCode::Validation),
        other => anyhow::bail!("expected short-password rejection, got {other:?}"),
    }

    client
        .send(Payload::RegisterUser(RegisterUser {
            password: "correct-horse".to_string(),
        }))
        .await?;
    let user_id = match client.recv().await? {
        Payload::RegisterResponse(r) if r.success => r.user_id.unwrap(),
        other => anyhow::bail!("unexpected register response: {other:?}"),
    };

    // A second connection can authenticate as carol with the password set.
    let mut second = server.connect().await?;
    second.recv().await?;
    second
        .send(Payload::AuthRequest(AuthRequest {
            nickname: "carol".to_string(),
            password: "correct-horse".to_string(),
        }))
        .await?;
    match second.recv().await? {
        Payload::AuthResponse(r) => {
            assert!(r.success);
            assert_eq!(r.user_id, Some(user_id));
        }
        other => anyhow::bail!("unexpected auth response: {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn duplicate_registration_is_rejected() -> anyhow::Result<()> {
    let server = TestServer::spawn(28084).await?;

    let mut first = server.connect().await?;
    first.recv().await?;
    first
        .send(Payload::SetNickname(SetNickname {
            nickname: "dave".to_string(),
        }))
        .await?;
    first.recv().await?;
    first
        .send(Payload::RegisterUser(RegisterUser {
            password: "first-password".to_string(),
        }))
        .await?;
    match first.recv().await? {
        Payload::RegisterResponse(r) => assert!(r.success),
        other => anyhow::bail!("unexpected response: {other:?}"),
    }

    let mut second = server.connect().await?;
    second.recv().await?;
    second
        .send(Payload::SetNickname(SetNickname {
            nickname: "dave".to_string(),
        }))
        .await?;
    match second.recv().await? {
        Payload::NicknameResponse(r) => {
            assert!(!r.success);
            assert_eq!(r.reason.as_deref(), Some("registered"));
        }
        other => anyhow::bail!("unexpected response: {other:?}"),
    }

    Ok(())
}
