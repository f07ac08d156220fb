//! Command handlers. Each returns the reply payload to send back to the
//! caller (`Ok(None)` for commands with no synchronous reply) or a
//! [`HandlerError`] that the caller turns into `ERROR`.

use std::time::{SystemTime, UNIX_EPOCH};

use superchat_proto::payload::{
    AddSshKey, AuthRequest, AuthResponse, ChangePassword, ChangePasswordResponse, ChannelSummary,
    CreateChannel, ChannelCreated, DeleteMessage, DeleteSshKey, EditMessage, GetUserInfo,
    JoinChannel, JoinResponse, ListMessages, MessageDeleted, MessageEdited,
    MessageList, MessagePosted, MessageSummary, NewMessage, NicknameResponse, PostMessage,
    RegisterResponse, RegisterUser, SetNickname, SshKeyList, SshKeySummary, SubscribeChannel,
    SubscribeOk, SubscribeThread, UnsubscribeChannel, UnsubscribeThread, UpdateSshKeyLabel,
    UserInfo,
};
use superchat_proto::Payload;

use crate::auth::{self, BackoffDecision};
use crate::db::channels::{ChannelRepository, ChannelType as DbChannelType};
use crate::db::messages::MessageRepository;
use crate::db::ssh_keys::SshKeyRepository;
use crate::db::users::UserRepository;
use crate::error::HandlerError;
use crate::session::{AuthState, SessionCtx, SessionPhase};
use crate::state::AppState;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as i64
}

fn validate_nickname(name: &str) -> Result<(), HandlerError> {
    let len = name.chars().count();
    let valid_chars = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !(1..=20).contains(&len) || !valid_chars || name.starts_with('~') {
        return Err(HandlerError::Validation(
            "nickname must be 1-20 alphanumeric/underscore characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_channel_name(name: &str) -> Result<(), HandlerError> {
    let len = name.chars().count();
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !(3..=30).contains(&len) || !valid_chars {
        return Err(HandlerError::Validation(
            "channel name must be 3-30 chars of [A-Za-z0-9_-]".to_string(),
        ));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), HandlerError> {
    let len = content.chars().count();
    if !(1..=4096).contains(&len) {
        return Err(HandlerError::Validation(
            "message content must be 1-4096 characters".to_string(),
        ));
    }
    Ok(())
}

pub async fn handle(
    ctx: &mut SessionCtx,
    state: &AppState,
    payload: Payload,
) -> Result<Option<Payload>, HandlerError> {
    // Every accepted connection and every POST_MESSAGE checks the IP ban
    // list first; checking it here for every frame is cheap (DashMap read)
    // and keeps the rule in one place.
    if let Some(ban) = state.ban_cache.check_ip(ctx.peer_ip) {
        return Err(HandlerError::Banned {
            reason: ban.reason,
            until_ms: None,
        });
    }

    match payload {
        Payload::Ping(hb) => Ok(Some(Payload::Pong(hb))),

        Payload::SetNickname(req) => set_nickname(ctx, state, req).await,
        Payload::AuthRequest(req) => auth_request(ctx, state, req).await,
        Payload::RegisterUser(req) => register_user(ctx, state, req).await,
        Payload::GetUserInfo(req) => get_user_info(state, req).await,
        Payload::ChangePassword(req) => change_password(ctx, state, req).await,
        Payload::AddSshKey(req) => add_ssh_key(ctx, state, req).await,
        Payload::ListSshKeys(_) => list_ssh_keys(ctx, state).await,
        Payload::UpdateSshKeyLabel(req) => update_ssh_key_label(ctx, state, req).await,
        Payload::DeleteSshKey(req) => delete_ssh_key(ctx, state, req).await,
        Payload::Disconnect(_) => {
            ctx.phase = SessionPhase::Closed;
            Ok(None)
        }

        Payload::ListChannels(_) => list_channels(state).await,
        Payload::ListServers(_) => Ok(Some(Payload::ServerList(
            superchat_proto::payload::ServerList { servers: vec![] },
        ))),

        Payload::JoinChannel(req) => join_channel(ctx, state, req).await,
        Payload::CreateChannel(req) => create_channel(ctx, state, req).await,
        Payload::SubscribeChannel(req) => subscribe_channel(ctx, state, req).await,
        Payload::UnsubscribeChannel(req) => unsubscribe_channel(ctx, state, req),
        Payload::SubscribeThread(req) => subscribe_thread(ctx, state, req),
        Payload::UnsubscribeThread(req) => unsubscribe_thread(ctx, state, req),

        Payload::ListMessages(req) => list_messages(state, req).await,
        Payload::PostMessage(req) => post_message(ctx, state, req).await,
        Payload::EditMessage(req) => edit_message(ctx, state, req).await,
        Payload::DeleteMessage(req) => delete_message(ctx, state, req).await,

        Payload::BanUser(req) => {
            admin_guard(ctx)?;
            Ok(Some(Payload::AdminOk(
                crate::admin::ban_user(
                    state,
                    ctx.user_id.unwrap(),
                    req.user_id,
                    &req.reason,
                    req.duration_secs,
                    req.shadowban,
                )
                .await?,
            )))
        }
        Payload::BanIp(req) => {
            admin_guard(ctx)?;
            Ok(Some(Payload::AdminOk(
                crate::admin::ban_ip(state, ctx.user_id.unwrap(), &req.cidr, &req.reason, req.duration_secs)
                    .await?,
            )))
        }
        Payload::UnbanUser(req) => {
            admin_guard(ctx)?;
            Ok(Some(Payload::AdminOk(crate::admin::unban_user(state, req).await?)))
        }
        Payload::UnbanIp(req) => {
            admin_guard(ctx)?;
            Ok(Some(Payload::AdminOk(crate::admin::unban_ip(state, req).await?)))
        }
        Payload::ListBans(_) => {
            admin_guard(ctx)?;
            Ok(Some(Payload::BanList(crate::admin::list_bans(state).await?)))
        }
        Payload::ListUsers(_) => {
            admin_guard(ctx)?;
            Ok(Some(Payload::UserList(crate::admin::list_users(state).await?)))
        }
        Payload::DeleteUser(req) => {
            admin_guard(ctx)?;
            Ok(Some(Payload::AdminOk(crate::admin::delete_user(state, req).await?)))
        }
        Payload::DeleteChannel(req) => {
            admin_guard(ctx)?;
            Ok(Some(Payload::AdminOk(
                crate::admin::delete_channel(state, req).await?,
            )))
        }

        // Server-push-only or reply-only variants never arrive as requests.
        _ => Err(HandlerError::Validation("unexpected message for this direction".to_string())),
    }
}

fn admin_guard(ctx: &SessionCtx) -> Result<(), HandlerError> {
    if ctx.is_admin {
        Ok(())
    } else {
        Err(HandlerError::Forbidden("admin privileges required".to_string()))
    }
}

async fn set_nickname(
    ctx: &mut SessionCtx,
    state: &AppState,
    req: SetNickname,
) -> Result<Option<Payload>, HandlerError> {
    validate_nickname(&req.nickname)?;
    let repo = UserRepository::new(state.db.pool());
    if repo.find_by_nickname(&req.nickname).await?.is_some() {
        return Ok(Some(Payload::NicknameResponse(NicknameResponse {
            success: false,
            reason: Some("registered".to_string()),
        })));
    }
    ctx.claimed_nickname = Some(format!("~{}", req.nickname));
    ctx.auth_state = AuthState::Anonymous;
    Ok(Some(Payload::NicknameResponse(NicknameResponse {
        success: true,
        reason: None,
    })))
}

async fn auth_request(
    ctx: &mut SessionCtx,
    state: &AppState,
    req: AuthRequest,
) -> Result<Option<Payload>, HandlerError> {
    let nickname_lower = req.nickname.to_lowercase();
    match state.auth_backoff.check(&nickname_lower) {
        BackoffDecision::Allowed => {}
        BackoffDecision::MustWait { retry_after_secs } => {
            return Err(HandlerError::RateLimited {
                retry_after_secs: Some(retry_after_secs),
            })
        }
        BackoffDecision::SessionClosed => unreachable!("check() never closes the session"),
    }

    let user = auth::authenticate_password(&state.db, &req.nickname, &req.password).await?;
    match user {
        Some(user) => {
            state.auth_backoff.record_success(&nickname_lower);
            ctx.user_id = Some(user.user_id);
            ctx.claimed_nickname = Some(user.nickname.clone());
            ctx.auth_state = AuthState::Authenticated;
            ctx.is_admin = user.is_admin();
            Ok(Some(Payload::AuthResponse(AuthResponse {
                success: true,
                user_id: Some(user.user_id as u64),
                reason: None,
            })))
        }
        None => match state.auth_backoff.record_failure(&nickname_lower) {
            BackoffDecision::SessionClosed => {
                ctx.phase = SessionPhase::Closed;
                Err(HandlerError::Forbidden(
                    "too many failed authentication attempts".to_string(),
                ))
            }
            _ => Ok(Some(Payload::AuthResponse(AuthResponse {
                success: false,
                user_id: None,
                reason: Some("invalid credentials".to_string()),
            }))),
        },
    }
}

async fn register_user(
    ctx: &mut SessionCtx,
    state: &AppState,
    req: RegisterUser,
) -> Result<Option<Payload>, HandlerError> {
    let Some(claimed) = ctx.claimed_nickname.clone() else {
        return Err(HandlerError::Validation(
            "SET_NICKNAME required before REGISTER_USER".to_string(),
        ));
    };
    let nickname = claimed.trim_start_matches('~').to_string();
    if req.password.len() < 8 {
        return Err(HandlerError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }

    match auth::register_user(&state.db, &nickname, &req.password, now_ms()).await {
        Ok(user_id) => {
            ctx.user_id = Some(user_id);
            ctx.claimed_nickname = Some(nickname.clone());
            ctx.auth_state = AuthState::Authenticated;

            if let Some(admin_nickname) = &state.config.server.admin_nickname {
                if admin_nickname.eq_ignore_ascii_case(&nickname) {
                    UserRepository::new(state.db.pool())
                        .set_admin(user_id, true)
                        .await?;
                    ctx.is_admin = true;
                }
            }

            Ok(Some(Payload::RegisterResponse(RegisterResponse {
                success: true,
                user_id: Some(user_id as u64),
                reason: None,
            })))
        }
        Err(crate::db::DbError::NicknameTaken) => Ok(Some(Payload::RegisterResponse(RegisterResponse {
            success: false,
            user_id: None,
            reason: Some("already registered".to_string()),
        }))),
        Err(e) => Err(e.into()),
    }
}

async fn get_user_info(
    state: &AppState,
    req: GetUserInfo,
) -> Result<Option<Payload>, HandlerError> {
    let repo = UserRepository::new(state.db.pool());
    let nickname = req.nickname.trim_start_matches('~');
    match repo.find_by_nickname(nickname).await? {
        Some(user) => Ok(Some(Payload::UserInfo(UserInfo {
            user_id: Some(user.user_id as u64),
            is_admin: user.is_admin(),
            nickname: user.nickname,
            is_registered: true,
            created_at: Some(user.created_at as u64),
        }))),
        None => Ok(Some(Payload::UserInfo(UserInfo {
            user_id: None,
            nickname: req.nickname,
            is_registered: false,
            is_admin: false,
            created_at: None,
        }))),
    }
}

async fn change_password(
    ctx: &mut SessionCtx,
    state: &AppState,
    req: ChangePassword,
) -> Result<Option<Payload>, HandlerError> {
    let Some(user_id) = ctx.user_id else {
        return Err(HandlerError::NotAuthenticated);
    };
    let repo = UserRepository::new(state.db.pool());
    let user = repo.find_by_id(user_id).await?.ok_or(HandlerError::NotFound)?;

    // SSH-pubkey-authenticated sessions have no legacy password to verify.
    if ctx.ssh_fingerprint.is_none() || user.password_hash.is_some() {
        let Some(current) = req.current_password.clone() else {
            return Ok(Some(Payload::ChangePasswordResponse(ChangePasswordResponse {
                success: false,
                reason: Some("current password required".to_string()),
            })));
        };
        let ok = match &user.password_hash {
            Some(hash) => crate::security::password::verify_password(current, hash.clone())
                .await
                .unwrap_or(false),
            None => false,
        };
        if !ok {
            return Ok(Some(Payload::ChangePasswordResponse(ChangePasswordResponse {
                success: false,
                reason: Some("current password incorrect".to_string()),
            })));
        }
    }

    if req.new_password.len() < 8 {
        return Err(HandlerError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    let hash = crate::security::password::hash_password(req.new_password, user.nickname.clone())
        .await
        .map_err(|e| HandlerError::Internal(e.to_string()))?;
    repo.set_password_hash(user_id, &hash).await?;
    Ok(Some(Payload::ChangePasswordResponse(ChangePasswordResponse {
        success: true,
        reason: None,
    })))
}

async fn add_ssh_key(
    ctx: &mut SessionCtx,
    state: &AppState,
    req: AddSshKey,
) -> Result<Option<Payload>, HandlerError> {
    let Some(user_id) = ctx.user_id else {
        return Err(HandlerError::NotAuthenticated);
    };
    let repo = SshKeyRepository::new(state.db.pool());
    let Some((fingerprint, key_type)) = repo.consume_registration_code(&req.code, now_ms()).await?
    else {
        return Err(HandlerError::Validation("registration code invalid or expired".to_string()));
    };
    repo.add(user_id, &fingerprint, &key_type, req.label.as_deref(), now_ms())
        .await?;
    list_ssh_keys_payload(state, user_id).await
}

async fn list_ssh_keys(
    ctx: &SessionCtx,
    state: &AppState,
) -> Result<Option<Payload>, HandlerError> {
    let Some(user_id) = ctx.user_id else {
        return Err(HandlerError::NotAuthenticated);
    };
    list_ssh_keys_payload(state, user_id).await
}

async fn list_ssh_keys_payload(
    state: &AppState,
    user_id: i64,
) -> Result<Option<Payload>, HandlerError> {
    let repo = SshKeyRepository::new(state.db.pool());
    let rows = repo.list_for_user(user_id).await?;
    Ok(Some(Payload::SshKeyList(SshKeyList {
        keys: rows
            .into_iter()
            .map(|k| SshKeySummary {
                key_id: k.key_id as u64,
                fingerprint: k.fingerprint,
                key_type: k.key_type,
                label: k.label,
                added_at: k.added_at as u64,
                last_used_at: k.last_used_at.map(|t| t as u64),
            })
            .collect(),
    })))
}

async fn update_ssh_key_label(
    ctx: &SessionCtx,
    state: &AppState,
    req: UpdateSshKeyLabel,
) -> Result<Option<Payload>, HandlerError> {
    if ctx.user_id.is_none() {
        return Err(HandlerError::NotAuthenticated);
    }
    let repo = SshKeyRepository::new(state.db.pool());
    repo.update_label(req.key_id as i64, &req.label).await?;
    Ok(Some(Payload::AdminOk(superchat_proto::payload::AdminOk {
        success: true,
        reason: None,
    })))
}

async fn delete_ssh_key(
    ctx: &SessionCtx,
    state: &AppState,
    req: DeleteSshKey,
) -> Result<Option<Payload>, HandlerError> {
    if ctx.user_id.is_none() {
        return Err(HandlerError::NotAuthenticated);
    }
    let repo = SshKeyRepository::new(state.db.pool());
    repo.delete(req.key_id as i64).await?;
    Ok(Some(Payload::AdminOk(superchat_proto::payload::AdminOk {
        success: true,
        reason: None,
    })))
}

async fn list_channels(state: &AppState) -> Result<Option<Payload>, HandlerError> {
    let repo = ChannelRepository::new(state.db.pool());
    let rows = repo.list().await?;
    Ok(Some(Payload::ChannelList(
        superchat_proto::payload::ChannelList {
            channels: rows.into_iter().map(channel_summary).collect(),
        },
    )))
}

fn channel_summary(row: crate::db::channels::ChannelRow) -> ChannelSummary {
    ChannelSummary {
        channel_id: row.channel_id as u64,
        name: row.name,
        display_name: row.display_name,
        description: row.description,
        channel_type: match row.channel_type {
            DbChannelType::Chat => superchat_proto::payload::ChannelType::Chat,
            DbChannelType::Forum => superchat_proto::payload::ChannelType::Forum,
        },
        retention_hours: row.retention_hours.map(|h| h as u32),
        message_limit: row.message_limit.map(|m| m as u32),
    }
}

async fn join_channel(
    ctx: &mut SessionCtx,
    state: &AppState,
    req: JoinChannel,
) -> Result<Option<Payload>, HandlerError> {
    let repo = ChannelRepository::new(state.db.pool());
    match repo.find_by_name(&req.name).await? {
        Some(row) => {
            state.broker.subscribe_channel(ctx.session_id, row.channel_id);
            Ok(Some(Payload::JoinResponse(JoinResponse {
                success: true,
                channel: Some(channel_summary(row)),
                reason: None,
            })))
        }
        None => Ok(Some(Payload::JoinResponse(JoinResponse {
            success: false,
            channel: None,
            reason: Some("no such channel".to_string()),
        }))),
    }
}

async fn create_channel(
    ctx: &mut SessionCtx,
    state: &AppState,
    req: CreateChannel,
) -> Result<Option<Payload>, HandlerError> {
    if ctx.auth_state == AuthState::None {
        return Err(HandlerError::NotAuthenticated);
    }
    if !state.config.channels.open_creation && ctx.auth_state != AuthState::Authenticated {
        return Err(HandlerError::Forbidden(
            "channel creation disabled for anonymous users".to_string(),
        ));
    }
    validate_channel_name(&req.name)?;

    let repo = ChannelRepository::new(state.db.pool());
    let db_type = match req.channel_type {
        superchat_proto::payload::ChannelType::Chat => DbChannelType::Chat,
        superchat_proto::payload::ChannelType::Forum => DbChannelType::Forum,
    };
    let retention_hours = req
        .retention_hours
        .map(|h| h as i64)
        .or(match db_type {
            DbChannelType::Forum => Some(state.config.history.default_forum_retention_hours as i64),
            DbChannelType::Chat => None,
        });
    let message_limit = req
        .message_limit
        .map(|m| m as i64)
        .or(match db_type {
            DbChannelType::Chat => Some(state.config.history.default_chat_ring_limit as i64),
            DbChannelType::Forum => None,
        });

    match repo
        .create(
            &req.name,
            &req.display_name,
            req.description.as_deref(),
            db_type,
            retention_hours,
            message_limit,
            ctx.user_id,
            now_ms(),
        )
        .await
    {
        Ok(channel_id) => {
            let row = repo.find_by_id(channel_id).await?.ok_or(HandlerError::Internal(
                "just-created channel vanished".to_string(),
            ))?;
            let summary = channel_summary(row);
            state
                .broker
                .broadcast_all(Payload::ChannelCreated(ChannelCreated {
                    success: true,
                    channel: Some(summary.clone()),
                    reason: None,
                }).into_frame());
            Ok(Some(Payload::ChannelCreated(ChannelCreated {
                success: true,
                channel: Some(summary),
                reason: None,
            })))
        }
        Err(crate::db::DbError::ChannelNameTaken) => Ok(Some(Payload::ChannelCreated(ChannelCreated {
            success: false,
            channel: None,
            reason: Some("channel name already exists".to_string()),
        }))),
        Err(e) => Err(e.into()),
    }
}

async fn subscribe_channel(
    ctx: &mut SessionCtx,
    state: &AppState,
    req: SubscribeChannel,
) -> Result<Option<Payload>, HandlerError> {
    state.broker.subscribe_channel(ctx.session_id, req.channel_id as i64);
    if let Some(sub) = req.subchannel_id {
        state
            .broker
            .subscribe_subchannel(ctx.session_id, req.channel_id as i64, sub as i64);
    }
    Ok(Some(Payload::SubscribeOk(SubscribeOk {
        channel_id: req.channel_id,
        subchannel_id: req.subchannel_id,
        subscribed: true,
    })))
}

fn unsubscribe_channel(
    ctx: &mut SessionCtx,
    state: &AppState,
    req: UnsubscribeChannel,
) -> Result<Option<Payload>, HandlerError> {
    state.broker.unsubscribe_channel(ctx.session_id, req.channel_id as i64);
    if let Some(sub) = req.subchannel_id {
        state
            .broker
            .unsubscribe_subchannel(ctx.session_id, req.channel_id as i64, sub as i64);
    }
    Ok(Some(Payload::SubscribeOk(SubscribeOk {
        channel_id: req.channel_id,
        subchannel_id: req.subchannel_id,
        subscribed: false,
    })))
}

fn subscribe_thread(
    ctx: &mut SessionCtx,
    state: &AppState,
    req: SubscribeThread,
) -> Result<Option<Payload>, HandlerError> {
    state.broker.subscribe_thread(ctx.session_id, req.thread_root_id as i64);
    Ok(None)
}

fn unsubscribe_thread(
    ctx: &mut SessionCtx,
    state: &AppState,
    req: UnsubscribeThread,
) -> Result<Option<Payload>, HandlerError> {
    state.broker.unsubscribe_thread(ctx.session_id, req.thread_root_id as i64);
    Ok(None)
}

fn message_summary(row: crate::db::messages::MessageRow) -> MessageSummary {
    MessageSummary {
        message_id: row.message_id as u64,
        channel_id: row.channel_id as u64,
        subchannel_id: row.subchannel_id.map(|s| s as u64),
        parent_id: row.parent_id.map(|p| p as u64),
        author_user_id: row.author_user_id.map(|u| u as u64),
        author_nickname: row.author_nickname,
        content: row.content,
        created_at: row.created_at as u64,
        edited_at: row.edited_at.map(|t| t as u64),
        deleted_at: row.deleted_at.map(|t| t as u64),
    }
}

async fn list_messages(
    state: &AppState,
    req: ListMessages,
) -> Result<Option<Payload>, HandlerError> {
    let limit = req.limit.clamp(1, 500) as i64;
    let repo = MessageRepository::new(state.db.pool());
    let (rows, has_more) = repo
        .list(
            req.channel_id as i64,
            req.subchannel_id.map(|s| s as i64),
            req.thread_root_id.map(|t| t as i64),
            req.before_id.map(|b| b as i64),
            req.after_id.map(|a| a as i64),
            limit,
        )
        .await?;
    Ok(Some(Payload::MessageList(MessageList {
        channel_id: req.channel_id,
        subchannel_id: req.subchannel_id,
        messages: rows.into_iter().map(message_summary).collect(),
        has_more,
    })))
}

async fn post_message(
    ctx: &mut SessionCtx,
    state: &AppState,
    req: PostMessage,
) -> Result<Option<Payload>, HandlerError> {
    let Some(nickname) = ctx.display_nickname() else {
        return Err(HandlerError::NotAuthenticated);
    };
    validate_content(&req.content)?;

    if let Some(user_id) = ctx.user_id {
        if let Some(ban) = state.ban_cache.check_user(user_id) {
            if !ban.is_shadowban {
                return Err(HandlerError::Banned {
                    reason: ban.reason,
                    until_ms: None,
                });
            }
        }
        if !state.rate_limiter.check_user_post(user_id) {
            crate::metrics::RATE_LIMITED.inc();
            return Err(HandlerError::RateLimited { retry_after_secs: Some(1) });
        }
    }
    if !state.rate_limiter.check_ip_post(ctx.peer_ip) {
        crate::metrics::RATE_LIMITED.inc();
        return Err(HandlerError::RateLimited { retry_after_secs: Some(1) });
    }

    let channel_repo = ChannelRepository::new(state.db.pool());
    let channel = channel_repo
        .find_by_id(req.channel_id as i64)
        .await?
        .ok_or(HandlerError::NotFound)?;
    let ring_limit = channel.message_limit;

    let message_id = state
        .write_batcher
        .submit(crate::db::messages::InsertRequest {
            channel_id: req.channel_id as i64,
            subchannel_id: req.subchannel_id.map(|s| s as i64),
            parent_id: req.parent_id.map(|p| p as i64),
            author_user_id: ctx.user_id,
            author_nickname: nickname,
            content: req.content.clone(),
            created_at: now_ms(),
            ring_limit,
        })
        .await?;
    let repo = MessageRepository::new(state.db.pool());
    let row = repo.find_by_id(message_id).await?.ok_or(HandlerError::Internal(
        "just-inserted message vanished".to_string(),
    ))?;
    crate::metrics::MESSAGES_POSTED.inc();
    let summary = message_summary(row.clone());

    let ack = Payload::MessagePosted(MessagePosted {
        success: true,
        message: Some(summary.clone()),
        reason: None,
    });

    let is_shadowbanned = ctx
        .user_id
        .and_then(|uid| state.ban_cache.check_user(uid))
        .map(|b| b.is_shadowban)
        .unwrap_or(false);

    if is_shadowbanned {
        // Shadowban isolation: the author's own session sees MESSAGE_POSTED
        // and NEW_MESSAGE; no other recipient is notified.
        state.broker.publish_to_session(
            ctx.session_id,
            Payload::NewMessage(NewMessage { message: summary }).into_frame(),
        );
    } else {
        state.broker.publish(
            req.channel_id as i64,
            req.subchannel_id.map(|s| s as i64),
            row.thread_root_id,
            Payload::NewMessage(NewMessage { message: summary }).into_frame(),
        );
    }

    Ok(Some(ack))
}

fn can_modify(ctx: &SessionCtx, row: &crate::db::messages::MessageRow) -> bool {
    if ctx.is_admin {
        return true;
    }
    if let Some(uid) = ctx.user_id {
        return row.author_user_id == Some(uid);
    }
    if row.author_user_id.is_none() {
        return ctx.claimed_nickname.as_deref() == Some(row.author_nickname.as_str());
    }
    false
}

async fn edit_message(
    ctx: &mut SessionCtx,
    state: &AppState,
    req: EditMessage,
) -> Result<Option<Payload>, HandlerError> {
    validate_content(&req.content)?;
    let repo = MessageRepository::new(state.db.pool());
    let row = repo
        .find_by_id(req.message_id as i64)
        .await?
        .ok_or(HandlerError::NotFound)?;
    if !can_modify(ctx, &row) {
        return Err(HandlerError::Forbidden("not the author".to_string()));
    }
    let edited_at = now_ms();
    repo.edit(req.message_id as i64, &req.content, edited_at).await?;
    let updated = repo
        .find_by_id(req.message_id as i64)
        .await?
        .ok_or(HandlerError::Internal("message vanished after edit".to_string()))?;
    let summary = message_summary(updated.clone());

    state.broker.publish(
        updated.channel_id,
        updated.subchannel_id,
        updated.thread_root_id,
        Payload::MessageEdited(MessageEdited {
            success: true,
            message: Some(summary.clone()),
            reason: None,
        })
        .into_frame(),
    );

    Ok(Some(Payload::MessageEdited(MessageEdited {
        success: true,
        message: Some(summary),
        reason: None,
    })))
}

async fn delete_message(
    ctx: &mut SessionCtx,
    state: &AppState,
    req: DeleteMessage,
) -> Result<Option<Payload>, HandlerError> {
    let repo = MessageRepository::new(state.db.pool());
    let row = repo
        .find_by_id(req.message_id as i64)
        .await?
        .ok_or(HandlerError::NotFound)?;
    if !can_modify(ctx, &row) {
        return Err(HandlerError::Forbidden("not the author".to_string()));
    }
    let by = if ctx.user_id == row.author_user_id && !ctx.is_admin {
        "author"
    } else {
        "moderator"
    };
    repo.delete(req.message_id as i64, now_ms(), by).await?;

    state.broker.publish(
        row.channel_id,
        row.subchannel_id,
        row.thread_root_id,
        Payload::MessageDeleted(MessageDeleted {
            success: true,
            message_id: req.message_id,
            reason: None,
        })
        .into_frame(),
    );

    Ok(Some(Payload::MessageDeleted(MessageDeleted {
        success: true,
        message_id: req.message_id,
        reason: None,
    })))
}

