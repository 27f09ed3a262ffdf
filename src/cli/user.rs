//! User commands

use anyhow::Context;
use clap::{Args, Subcommand};
use serde_json::json;

use crate::domain::user::{ListCriteria, DEFAULT_LIST_LIMIT};
use crate::infrastructure::user::{CreateUserRequest, UpdateUserRequest};
use crate::AppContext;

use super::print_json;

#[derive(Subcommand)]
pub enum UserCommand {
    /// Get a user by id
    Get {
        #[arg(long)]
        id: i64,
    },

    /// Get a user by email
    GetByEmail {
        #[arg(long)]
        email: String,
    },

    /// List users
    List(ListArgs),

    /// Create a user
    Create(CreateArgs),

    /// Update a user; only the given fields change
    Update(UpdateArgs),

    /// Delete a user
    Delete {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long, default_value_t = 0)]
    pub skip: u64,

    #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
    pub limit: u64,

    /// Only users with this active flag
    #[arg(long)]
    pub active: Option<bool>,

    /// Only users with this superuser flag
    #[arg(long)]
    pub superuser: Option<bool>,
}

#[derive(Args)]
pub struct CreateArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub password: String,

    #[arg(long)]
    pub full_name: Option<String>,

    #[arg(long)]
    pub superuser: bool,

    /// Create the user deactivated
    #[arg(long)]
    pub inactive: bool,
}

#[derive(Args)]
pub struct UpdateArgs {
    #[arg(long)]
    pub id: i64,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    #[arg(long)]
    pub full_name: Option<String>,

    #[arg(long)]
    pub active: Option<bool>,

    #[arg(long)]
    pub superuser: Option<bool>,
}

impl From<ListArgs> for ListCriteria {
    fn from(args: ListArgs) -> Self {
        Self {
            skip: args.skip,
            limit: args.limit,
            is_active: args.active,
            is_superuser: args.superuser,
        }
    }
}

impl From<CreateArgs> for CreateUserRequest {
    fn from(args: CreateArgs) -> Self {
        Self {
            email: args.email,
            username: args.username,
            password: args.password,
            full_name: args.full_name,
            is_active: !args.inactive,
            is_superuser: args.superuser,
        }
    }
}

impl From<UpdateArgs> for UpdateUserRequest {
    fn from(args: UpdateArgs) -> Self {
        Self {
            email: args.email,
            username: args.username,
            password: args.password,
            full_name: args.full_name,
            is_active: args.active,
            is_superuser: args.superuser,
        }
    }
}

pub async fn run(ctx: &AppContext, command: UserCommand) -> anyhow::Result<()> {
    match command {
        UserCommand::Get { id } => {
            let user = ctx.users.get(id).await?.with_context(|| format!("User {} not found", id))?;
            print_json(&user)
        }
        UserCommand::GetByEmail { email } => {
            let user = ctx
                .users
                .get_by_email(&email)
                .await?
                .with_context(|| format!("User with email '{}' not found", email))?;
            print_json(&user)
        }
        UserCommand::List(args) => {
            let users = ctx.users.list(&args.into()).await?;
            print_json(&users)
        }
        UserCommand::Create(args) => {
            let user = ctx.users.create(args.into()).await?;
            print_json(&user)
        }
        UserCommand::Update(args) => {
            let id = args.id;
            let user = ctx.users.update(id, args.into()).await?;
            print_json(&user)
        }
        UserCommand::Delete { id } => {
            ctx.users.delete(id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    fn parse(args: &[&str]) -> UserCommand {
        let mut argv = vec!["user-cache", "user"];
        argv.extend_from_slice(args);

        match Cli::try_parse_from(argv).unwrap().command {
            Command::User(command) => command,
            Command::Health => panic!("expected a user command"),
        }
    }

    #[test]
    fn test_parse_list_defaults() {
        let UserCommand::List(args) = parse(&["list"]) else {
            panic!("expected list");
        };

        let criteria = ListCriteria::from(args);
        assert_eq!(criteria, ListCriteria::default());
    }

    #[test]
    fn test_parse_list_filters() {
        let UserCommand::List(args) =
            parse(&["list", "--skip", "5", "--limit", "10", "--active", "true"])
        else {
            panic!("expected list");
        };

        let criteria = ListCriteria::from(args);
        assert_eq!(criteria, ListCriteria::new(5, 10).active(true));
    }

    #[test]
    fn test_parse_create_flags() {
        let UserCommand::Create(args) = parse(&[
            "create",
            "--email",
            "eve@example.com",
            "--username",
            "eve",
            "--password",
            "testpass123",
            "--superuser",
            "--inactive",
        ]) else {
            panic!("expected create");
        };

        let request = CreateUserRequest::from(args);
        assert!(request.is_superuser);
        assert!(!request.is_active);
        assert!(request.full_name.is_none());
    }

    #[test]
    fn test_parse_get_by_email() {
        assert!(matches!(
            parse(&["get-by-email", "--email", "eve@example.com"]),
            UserCommand::GetByEmail { email } if email == "eve@example.com"
        ));
    }

    #[test]
    fn test_update_requires_id() {
        assert!(Cli::try_parse_from(["user-cache", "user", "update", "--email", "x@example.com"]).is_err());
    }
}
