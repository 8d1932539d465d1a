//! End-to-end command flows against an in-memory store.

use guild_commands::{
    ensure_owners, parse_role_list, CommandCatalog, CommandError, NoopEscalator,
    PermissionCommands, PermsCommand, PermsReply, RoleCommands, StaticDirectory,
};
use guild_rbac::{Actor, DelegationKind, PrincipalId, RoleAction, RoleId, TenantId};
use guild_store::{MemorySnapshotBackend, PermissionStore, StoreConfig};
use std::sync::Arc;

const GUILD: TenantId = TenantId(42);
const OWNER: PrincipalId = PrincipalId(1);
const LEAD: PrincipalId = PrincipalId(2);
const HELPER: PrincipalId = PrincipalId(3);
const MEMBER: PrincipalId = PrincipalId(4);
const STAFF_ROLE: RoleId = PrincipalId(700);
const EVENTS_ROLE: RoleId = PrincipalId(701);

struct Bot {
    store: Arc<PermissionStore>,
    perms: PermissionCommands,
    roles: RoleCommands,
}

async fn bot() -> Bot {
    let store = Arc::new(
        PermissionStore::with_backend(
            Arc::new(MemorySnapshotBackend::new()),
            StoreConfig::default(),
        )
        .await
        .unwrap(),
    );
    let summary = ensure_owners(&store, [(GUILD, OWNER)]).await;
    assert_eq!(summary.granted, vec![GUILD]);

    let directory = StaticDirectory::new()
        .with_member(GUILD, LEAD)
        .with_member(GUILD, HELPER)
        .with_member(GUILD, MEMBER);
    let perms = PermissionCommands::new(
        store.clone(),
        CommandCatalog::builtin(),
        Arc::new(directory),
        Arc::new(NoopEscalator),
    );
    let roles = RoleCommands::new(store.clone());
    Bot {
        store,
        perms,
        roles,
    }
}

#[tokio::test]
async fn owner_delegates_role_management() {
    let bot = bot().await;
    let owner = Actor::new(GUILD, OWNER);

    // staff role may run perms; lead holds the staff role
    bot.perms
        .execute(&owner, PermsCommand::new("add", "<@&700>", "perms"))
        .await
        .unwrap();
    let lead = Actor::new(GUILD, LEAD).with_roles([STAFF_ROLE]);

    // lead grants helper generic authority over the events role
    let reply = bot
        .perms
        .execute(
            &lead,
            PermsCommand::new("add", "3", "role").with_subcommand("<@&701>"),
        )
        .await
        .unwrap();
    assert!(matches!(reply, PermsReply::Granted { .. }));

    let helper = Actor::new(GUILD, HELPER);
    assert!(bot
        .roles
        .check_batch(&helper, RoleAction::Delete, &[EVENTS_ROLE])
        .await
        .all_allowed());

    // helper makes member a manager of the events role
    let update = bot
        .roles
        .edit_delegates(&helper, EVENTS_ROLE, Some("<@4>"), None)
        .await
        .unwrap();
    assert_eq!(update.manager, Some(MEMBER));

    let member = Actor::new(GUILD, MEMBER);
    let roles: Vec<RoleId> = parse_role_list("<@&701>, 700")
        .into_iter()
        .map(|(_, parsed)| parsed.unwrap())
        .collect();
    let check = bot.roles.check_batch(&member, RoleAction::Assign, &roles).await;
    assert_eq!(check.allowed, vec![EVENTS_ROLE]);
    assert_eq!(check.denied.len(), 1);

    let check = bot
        .roles
        .check_batch(&member, RoleAction::Delete, &[EVENTS_ROLE])
        .await;
    assert!(!check.all_allowed());

    let report = bot.store.report(&member).await;
    assert_eq!(report.manager_of, vec![EVENTS_ROLE]);
}

#[tokio::test]
async fn member_without_perms_cannot_escalate() {
    let bot = bot().await;
    let member = Actor::new(GUILD, MEMBER);

    let err = bot
        .perms
        .execute(&member, PermsCommand::new("add", "<@4>", "*"))
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Forbidden(_)));
    assert!(!bot.store.authorize(&member, "perms", None).await);

    let err = bot
        .roles
        .remove_delegate(&member, DelegationKind::Admin, STAFF_ROLE, "<@2>")
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");
}

#[tokio::test]
async fn master_access_lifecycle() {
    let bot = bot().await;
    let owner = Actor::new(GUILD, OWNER);
    let helper = Actor::new(GUILD, HELPER);

    bot.perms
        .execute(&owner, PermsCommand::new("add", "<@3>", "*"))
        .await
        .unwrap();
    assert!(bot.store.authorize(&helper, "showperms", None).await);
    assert!(bot.perms.show(&helper).await.is_ok());

    let reply = bot
        .perms
        .execute(&owner, PermsCommand::new("remove", "<@3>", "*"))
        .await
        .unwrap();
    assert_eq!(reply.to_string(), "Master access revoked from <@3>.");
    assert!(bot.perms.check(&helper).await.is_err());
}
