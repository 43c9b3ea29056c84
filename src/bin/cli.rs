use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use taskboard_access::authz::{
    OrganizationClaim, PrincipalClaims, RoleHierarchy, RoleRegistry,
};
use taskboard_access::config::{load_env, AccessConfig};
use taskboard_access::jwt::JwtConfig;
use taskboard_access::routes::RouteTable;
use taskboard_access::{DefaultPolicyEvaluator, Location, Principal, RouteGuard, SessionSnapshot};

#[derive(Parser, Debug)]
#[command(author, version, about = "taskboard access-control tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print both role hierarchies with their ranks and permission sets
    Roles,
    /// Run the route guard for a path and print the decision as JSON
    Check {
        /// Requested location, e.g. /projects/42/board
        #[arg(long)]
        path: String,
        /// Session token to rehydrate the principal from (needs JWT_SECRET)
        #[arg(long, conflicts_with = "principal")]
        token: Option<String>,
        /// JSON file holding principal claims
        #[arg(long)]
        principal: Option<PathBuf>,
    },
    /// Mint a development session token (needs JWT_SECRET)
    IssueToken {
        #[arg(long)]
        role: String,
        #[arg(long)]
        user_id: Option<Uuid>,
        /// Explicit permission override; repeat for several
        #[arg(long = "permission")]
        permissions: Vec<String>,
        #[arg(long, requires = "org_role")]
        org_id: Option<Uuid>,
        #[arg(long, requires = "org_id")]
        org_role: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();
    let config = AccessConfig::from_env()?;

    match cli.command {
        Commands::Roles => {
            let registry = config.load_registry()?;
            print_roles(&registry);
        }
        Commands::Check {
            path,
            token,
            principal,
        } => {
            let registry = Arc::new(config.load_registry()?);
            let guard = RouteGuard::new(
                Arc::new(DefaultPolicyEvaluator::new(registry)),
                config.guard.clone(),
            )
            .with_routes(RouteTable::standard()?);

            let session = match (token, principal) {
                (Some(token), _) => {
                    let jwt = JwtConfig::from_env()?;
                    SessionSnapshot::signed_in(jwt.principal_from_token(&token)?)
                }
                (None, Some(file)) => {
                    let contents = fs::read_to_string(&file)
                        .with_context(|| format!("failed to read {}", file.display()))?;
                    let claims: PrincipalClaims = serde_json::from_str(&contents)
                        .with_context(|| format!("invalid principal claims in {}", file.display()))?;
                    SessionSnapshot::signed_in(Principal::from_claims(&claims))
                }
                (None, None) => SessionSnapshot::signed_out(),
            };

            let location = Location::parse(&path);
            let decision = guard.guard_path(&session, &location);
            let mut output = serde_json::to_value(&decision)?;
            if let (Some(href), Some(map)) = (guard.href(&decision), output.as_object_mut()) {
                map.insert("href".to_string(), serde_json::Value::String(href));
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::IssueToken {
            role,
            user_id,
            permissions,
            org_id,
            org_role,
        } => {
            let jwt = JwtConfig::from_env()?;
            let claims = PrincipalClaims {
                sub: user_id.unwrap_or_else(Uuid::new_v4),
                role,
                permissions: (!permissions.is_empty()).then_some(permissions),
                organization: org_id
                    .zip(org_role)
                    .map(|(id, role)| OrganizationClaim { id, role }),
            };
            println!("{}", jwt.encode(claims)?);
        }
    }

    Ok(())
}

fn print_roles(registry: &RoleRegistry) {
    println!("System roles");
    for role in registry.system_hierarchy() {
        let mut names: Vec<&str> = registry
            .permissions_for(Some(*role))
            .map(|set| set.iter().map(|p| p.as_str()).collect())
            .unwrap_or_default();
        names.sort_unstable();
        println!("  {:<2} {:<12} {}", role.rank(), role.as_str(), names.join(", "));
    }

    println!("Organization roles");
    for role in registry.org_hierarchy() {
        let mut names: Vec<&str> = registry
            .org_permissions_for(Some(*role))
            .map(|set| set.iter().map(|p| p.as_str()).collect())
            .unwrap_or_default();
        names.sort_unstable();
        println!("  {:<2} {:<12} {}", role.rank(), role.as_str(), names.join(", "));
    }
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
