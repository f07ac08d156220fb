mod common;

use common::TestServer;
use superchat_proto::payload::{BanUser, RegisterUser, SetNickname, UnbanUser};
use superchat_proto::Payload;

#[tokio::test]
async fn non_admin_is_forbidden_from_ban_commands() -> anyhow::Result<()> {
    let server = TestServer::spawn(28085).await?;
    let mut client = server.connect().await?;
    client.handshake("erin").await?;

    client
        .send(Payload::BanUser(BanUser {
            user_id: 1,
            reason: "test".to_string(),
            duration_secs: None,
            shadowban: false,
        }))
        .await?;
    match client.recv().await? {
        Payload::Error(e) => assert_eq!(e.code, superchat_proto::payload::WireErrorCode::Forbidden),
        other => anyhow::bail!("expected FORBIDDEN, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn configured_admin_nickname_promotes_on_registration_and_can_ban() -> anyhow::Result<()> {
    let server = TestServer::spawn_with_admin(28086, Some("root")).await?;

    let mut admin = server.connect().await?;
    admin.recv().await?;
    admin
        .send(Payload::SetNickname(SetNickname {
            nickname: "root".to_string(),
        }))
        .await?;
    admin.recv().await?;
    admin
        .send(Payload::RegisterUser(RegisterUser {
            password: "super-secret-pw".to_string(),
        }))
        .await?;
    match admin.recv().await? {
        Payload::RegisterResponse(r) => assert!(r.success),
        other => anyhow::bail!("unexpected register response: {other:?}"),
    }

    let mut target = server.connect().await?;
    target.recv().await?;
    target
        .send(Payload::SetNickname(SetNickname {
            nickname: "frank".to_string(),
        }))
        .await?;
    target.recv().await?;
    target
        .send(Payload::RegisterUser(RegisterUser {
            password: "another-pw-123".to_string(),
        }))
        .await?;
    let target_id = match target.recv().await? {
        Payload::RegisterResponse(r) if r.success => r.user_id.unwrap(),
        other => anyhow::bail!("unexpected register response: {other:?}"),
    };

    admin
        .send(Payload::BanUser(BanUser {
            user_id: target_id,
            reason: "spamming".to_string(),
            duration_secs: Some(3600),
            shadowban: false,
        }))
        .await?;
    match admin.recv().await? {
        Payload::AdminOk(ok) => assert!(ok.success),
        other => anyhow::bail!("expected ADMIN_OK, got {other:?}"),
    }

    admin
        .send(Payload::UnbanUser(UnbanUser { user_id: target_id }))
        .await?;
    match admin.recv().await? {
        Payload::AdminOk(ok) => assert!(ok.success),
        other => anyhow::bail!("expected ADMIN_OK, got {other:?}"),
    }

    Ok(())
}
