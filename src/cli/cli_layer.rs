// CLI layer - the operator-facing adapter over the core services.
//
// Role checks live here, at the transport boundary. The coordinators trust
// that whoever calls them has already been authorized, so every moderation
// command resolves the actor's role and applies the single guard before
// touching a service.

use crate::core::moderation::{
    require_moderator, ModerationError, ModerationService, Resource, ResourceOwner,
    ResourceStatus, StatusHistoryRecord, VersionModerationOutcome,
};
use crate::core::notifications::{
    Notification, NotificationFilter, NotificationKind, NotificationPreferences,
    NotificationService, PreferenceSwitch, UserDirectory,
};
use crate::infra::catalog::SqliteCatalogStore;
use crate::infra::directory::SqliteDirectoryStore;
use crate::infra::notifications::SqliteNotificationStore;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// Everything the command handlers need, wired up in main.
pub struct Data {
    pub moderation:
        Arc<ModerationService<SqliteCatalogStore, SqliteNotificationStore, SqliteDirectoryStore>>,
    pub notifications: Arc<NotificationService<SqliteNotificationStore, SqliteDirectoryStore>>,
    /// Separate handle for account administration; shares the pool with the
    /// directory inside the notification service.
    pub directory: Arc<SqliteDirectoryStore>,
}

const USAGE: &str = "\
Usage: modmarket <command> [args]

Accounts:
  add-user <username> [user|moderator|admin|super_admin]
  add-team <name> <owner-user-id>
  follow <follower-id> <followed-id>

Catalog:
  create-resource <user-id> <name> [--team <team-id>]
  submit-version <resource-id> <version-number>
  history <resource-id>

Moderation (actor must be moderator or higher):
  moderate <actor-id> <resource-id> <status> [--reason <text>] [--notes <text>]
  approve-version <actor-id> <version-id>
  reject-version <actor-id> <version-id> <reason>

Notifications:
  notifications <user-id> [--unread] [--kind <KIND>] [--limit <n>]
  unread <user-id>
  mark-read <user-id> <notification-id>
  mark-all-read <user-id>
  delete-notification <user-id> <notification-id>
  prefs <user-id>
  set-pref <user-id> <switch> <on|off>";

fn parse_id(raw: &str, what: &str) -> Result<u64> {
    raw.parse::<u64>()
        .with_context(|| format!("{} must be a numeric id, got '{}'", what, raw))
}

fn parse_switch(raw: &str) -> Result<PreferenceSwitch> {
    let switch = match raw.to_ascii_lowercase().replace('_', "-").as_str() {
        "liked-project-updates" => PreferenceSwitch::LikedProjectUpdates,
        "new-creator-uploads" => PreferenceSwitch::NewCreatorUploads,
        "new-followers" => PreferenceSwitch::NewFollowers,
        "version-status" => PreferenceSwitch::VersionStatus,
        "collection-additions" => PreferenceSwitch::CollectionAdditions,
        "showcase-interactions" => PreferenceSwitch::ShowcaseInteractions,
        other => bail!(
            "unknown preference switch '{}' (expected one of: liked-project-updates, \
             new-creator-uploads, new-followers, version-status, collection-additions, \
             showcase-interactions)",
            other
        ),
    };
    Ok(switch)
}

/// Pull `--flag value` out of an argument list, returning the remaining
/// positional arguments.
fn take_flag(args: &mut Vec<String>, flag: &str) -> Result<Option<String>> {
    if let Some(pos) = args.iter().position(|a| a == flag) {
        if pos + 1 >= args.len() {
            bail!("{} requires a value", flag);
        }
        let value = args.remove(pos + 1);
        args.remove(pos);
        Ok(Some(value))
    } else {
        Ok(None)
    }
}

fn take_switch(args: &mut Vec<String>, flag: &str) -> bool {
    if let Some(pos) = args.iter().position(|a| a == flag) {
        args.remove(pos);
        true
    } else {
        false
    }
}

/// Resolve the actor's role and enforce the moderator guard.
async fn authorize_moderator(data: &Data, actor_id: u64) -> Result<()> {
    let role = data
        .notifications
        .directory()
        .role_of(actor_id)
        .await?
        .ok_or(ModerationError::NotFound("Actor"))?;
    require_moderator(role)?;
    Ok(())
}

fn render_resource(resource: &Resource) {
    let owner = match resource.owner {
        ResourceOwner::User(id) => format!("user {}", id),
        ResourceOwner::Team(id) => format!("team {}", id),
    };
    println!(
        "#{} {} [{}] slug={} owner={}",
        resource.id, resource.name, resource.status, resource.slug, owner
    );
    if let Some(reason) = &resource.rejection_reason {
        println!("  reason: {}", reason);
    }
    if let Some(latest) = resource.latest_version_id {
        println!("  latest version: {}", latest);
    }
}

fn render_history(records: &[StatusHistoryRecord]) {
    for record in records {
        println!(
            "{} {} -> {} by {}{}",
            record.changed_at.to_rfc3339(),
            record.from_status,
            record.to_status,
            record.changed_by,
            record
                .reason
                .as_deref()
                .map(|r| format!(" ({})", r))
                .unwrap_or_default()
        );
    }
}

fn render_notification(n: &Notification) {
    println!(
        "#{} [{}{}] {}: {}",
        n.id,
        n.kind,
        if n.read { ", read" } else { "" },
        n.title,
        n.message
    );
}

fn render_prefs(prefs: &NotificationPreferences) {
    let line = |name: &str, on: bool| println!("  {}: {}", name, if on { "on" } else { "off" });
    line("liked-project-updates", prefs.liked_project_updates);
    line("new-creator-uploads", prefs.new_creator_uploads);
    line("new-followers", prefs.new_followers);
    line("version-status", prefs.version_status);
    line("collection-additions", prefs.collection_additions);
    line("showcase-interactions", prefs.showcase_interactions);
}

async fn print_version_outcome(outcome: VersionModerationOutcome) {
    println!("{}", outcome.message);
    println!(
        "version #{} [{}] {}",
        outcome.version.id, outcome.version.status, outcome.version.version_number
    );
    // The fan-out runs on a detached task; give it a moment to land before
    // the process exits.
    tokio::time::sleep(Duration::from_millis(100)).await;
}

pub async fn run(data: &Data, args: Vec<String>) -> Result<()> {
    let mut args = args;
    let Some(command) = args.first().cloned() else {
        println!("{}", USAGE);
        return Ok(());
    };
    args.remove(0);

    match command.as_str() {
        "add-user" => {
            let [username, rest @ ..] = args.as_slice() else {
                bail!("usage: add-user <username> [role]");
            };
            let role = match rest.first() {
                Some(raw) => raw.parse().map_err(anyhow::Error::msg)?,
                None => crate::core::moderation::UserRole::User,
            };
            let id = data.directory.create_user(username, role).await?;
            println!("user #{} {} ({})", id, username, role);
        }
        "add-team" => {
            let [name, owner] = args.as_slice() else {
                bail!("usage: add-team <name> <owner-user-id>");
            };
            let owner = parse_id(owner, "owner")?;
            let id = data.directory.create_team(name, owner).await?;
            println!("team #{} {} owned by {}", id, name, owner);
        }
        "follow" => {
            let [follower, followed] = args.as_slice() else {
                bail!("usage: follow <follower-id> <followed-id>");
            };
            data.directory
                .add_follow(parse_id(follower, "follower")?, parse_id(followed, "followed")?)
                .await?;
            println!("{} now follows {}", follower, followed);
        }
        "create-resource" => {
            let team = take_flag(&mut args, "--team")?;
            let [user, name] = args.as_slice() else {
                bail!("usage: create-resource <user-id> <name> [--team <team-id>]");
            };
            let user_id = parse_id(user, "user")?;
            let owner = match team {
                Some(team_id) => ResourceOwner::Team(parse_id(&team_id, "team")?),
                None => ResourceOwner::User(user_id),
            };
            let resource = data.moderation.create_resource(user_id, name, owner).await?;
            render_resource(&resource);
        }
        "submit-version" => {
            let [resource, number] = args.as_slice() else {
                bail!("usage: submit-version <resource-id> <version-number>");
            };
            let version = data
                .moderation
                .submit_version(parse_id(resource, "resource")?, number)
                .await?;
            println!(
                "version #{} [{}] {} for resource {}",
                version.id, version.status, version.version_number, version.resource_id
            );
        }
        "history" => {
            let [resource] = args.as_slice() else {
                bail!("usage: history <resource-id>");
            };
            let records = data
                .moderation
                .moderation_history(parse_id(resource, "resource")?)
                .await?;
            render_history(&records);
        }
        "moderate" => {
            let reason = take_flag(&mut args, "--reason")?;
            let notes = take_flag(&mut args, "--notes")?;
            let [actor, resource, status] = args.as_slice() else {
                bail!("usage: moderate <actor-id> <resource-id> <status> [--reason <text>] [--notes <text>]");
            };
            let actor_id = parse_id(actor, "actor")?;
            authorize_moderator(data, actor_id).await?;
            let status: ResourceStatus = status.parse().map_err(anyhow::Error::msg)?;
            let outcome = data
                .moderation
                .moderate_resource(
                    actor_id,
                    parse_id(resource, "resource")?,
                    status,
                    reason.as_deref(),
                    notes.as_deref(),
                )
                .await?;
            println!("{}", outcome.message);
            render_resource(&outcome.resource);
        }
        "approve-version" => {
            let [actor, version] = args.as_slice() else {
                bail!("usage: approve-version <actor-id> <version-id>");
            };
            let actor_id = parse_id(actor, "actor")?;
            authorize_moderator(data, actor_id).await?;
            let outcome = data
                .moderation
                .approve_version(actor_id, parse_id(version, "version")?)
                .await?;
            print_version_outcome(outcome).await;
        }
        "reject-version" => {
            let [actor, version, reason @ ..] = args.as_slice() else {
                bail!("usage: reject-version <actor-id> <version-id> <reason>");
            };
            let actor_id = parse_id(actor, "actor")?;
            authorize_moderator(data, actor_id).await?;
            let outcome = data
                .moderation
                .reject_version(actor_id, parse_id(version, "version")?, &reason.join(" "))
                .await?;
            print_version_outcome(outcome).await;
        }
        "notifications" => {
            let unread_only = take_switch(&mut args, "--unread");
            let kind = take_flag(&mut args, "--kind")?;
            let limit = take_flag(&mut args, "--limit")?;
            let [user] = args.as_slice() else {
                bail!("usage: notifications <user-id> [--unread] [--kind <KIND>] [--limit <n>]");
            };
            let filter = NotificationFilter {
                kind: kind
                    .map(|k| k.parse::<NotificationKind>().map_err(anyhow::Error::msg))
                    .transpose()?,
                read: unread_only.then_some(false),
                limit: limit
                    .map(|l| l.parse::<u32>().context("--limit must be a number"))
                    .transpose()?,
            };
            let rows = data
                .notifications
                .notifications_for(parse_id(user, "user")?, filter)
                .await?;
            for row in &rows {
                render_notification(row);
            }
        }
        "unread" => {
            let [user] = args.as_slice() else {
                bail!("usage: unread <user-id>");
            };
            let count = data
                .notifications
                .unread_count(parse_id(user, "user")?)
                .await?;
            println!("{} unread", count);
        }
        "mark-read" => {
            let [user, notification] = args.as_slice() else {
                bail!("usage: mark-read <user-id> <notification-id>");
            };
            let updated = data
                .notifications
                .mark_read(parse_id(notification, "notification")?, parse_id(user, "user")?)
                .await?;
            render_notification(&updated);
        }
        "mark-all-read" => {
            let [user] = args.as_slice() else {
                bail!("usage: mark-all-read <user-id>");
            };
            let changed = data
                .notifications
                .mark_all_read(parse_id(user, "user")?)
                .await?;
            println!("{} marked read", changed);
        }
        "delete-notification" => {
            let [user, notification] = args.as_slice() else {
                bail!("usage: delete-notification <user-id> <notification-id>");
            };
            data.notifications
                .delete_notification(parse_id(notification, "notification")?, parse_id(user, "user")?)
                .await?;
            println!("deleted");
        }
        "prefs" => {
            let [user] = args.as_slice() else {
                bail!("usage: prefs <user-id>");
            };
            let user_id = parse_id(user, "user")?;
            let prefs = data
                .notifications
                .preferences(user_id)
                .await?
                .with_context(|| format!("user {} not found", user_id))?;
            render_prefs(&prefs);
        }
        "set-pref" => {
            let [user, switch, value] = args.as_slice() else {
                bail!("usage: set-pref <user-id> <switch> <on|off>");
            };
            let user_id = parse_id(user, "user")?;
            let switch = parse_switch(switch)?;
            let enabled = match value.as_str() {
                "on" | "true" | "1" => true,
                "off" | "false" | "0" => false,
                other => bail!("expected on|off, got '{}'", other),
            };
            let mut prefs = data
                .notifications
                .preferences(user_id)
                .await?
                .with_context(|| format!("user {} not found", user_id))?;
            prefs.set_enabled(switch, enabled);
            let saved = data.notifications.update_preferences(user_id, prefs).await?;
            render_prefs(&saved);
        }
        "help" | "--help" | "-h" => println!("{}", USAGE),
        other => {
            println!("unknown command '{}'\n\n{}", other, USAGE);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_extracted_from_anywhere() {
        let mut args: Vec<String> = ["1", "--reason", "spam", "2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let reason = take_flag(&mut args, "--reason").unwrap();
        assert_eq!(reason.as_deref(), Some("spam"));
        assert_eq!(args, vec!["1", "2"]);
        assert_eq!(take_flag(&mut args, "--notes").unwrap(), None);
    }

    #[test]
    fn flag_without_value_is_an_error() {
        let mut args: Vec<String> = ["1", "--reason"].iter().map(|s| s.to_string()).collect();
        assert!(take_flag(&mut args, "--reason").is_err());
    }

    #[test]
    fn switch_names_parse_in_both_spellings() {
        assert_eq!(
            parse_switch("version-status").unwrap(),
            PreferenceSwitch::VersionStatus
        );
        assert_eq!(
            parse_switch("VERSION_STATUS").unwrap(),
            PreferenceSwitch::VersionStatus
        );
        assert!(parse_switch("mystery").is_err());
    }

    #[test]
    fn ids_must_be_numeric() {
        assert_eq!(parse_id("42", "user").unwrap(), 42);
        assert!(parse_id("abc", "user").is_err());
    }
}
