use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;

use renaltrack::config::{config_schema, load_config};
use renaltrack::startup;
use renaltrack::utils::logger::init_logging;
use renaltrack::{Error, RequestOptions, Result, SessionEvent};

#[derive(Parser)]
#[command(name = "renaltrack", version, about = "Dialysis tracker API client")]
struct Cli {
    /// Path to the YAML configuration
    #[arg(long, short, env = "RENALTRACK_CONFIG", default_value = "./config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the JSON schema of the configuration file
    Schema,
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "RENALTRACK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "RENALTRACK_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        full_name: String,
    },
    /// Sign in with a Google ID token
    Google {
        #[arg(long)]
        id_token: String,
    },
    /// Sign out and clear the local session
    Logout,
    /// Show the signed-in user
    Me,
    /// Show whether a session is active
    Status,
    /// GET an API endpoint with the current session, e.g. `/sessions`
    Get {
        endpoint: String,
        /// Query parameters as key=value
        #[arg(long = "query", short = 'q')]
        query: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Command::Schema = cli.command {
        println!("{}", config_schema()?);
        return Ok(());
    }

    let config = Arc::new(load_config(&cli.config)?);
    init_logging(&config.logging)?;
    let ctx = startup::build(config).await?;

    let _expiry = ctx.signal.subscribe(|event| {
        if let SessionEvent::Expired { .. } = event {
            eprintln!("Your session has expired. Run `renaltrack login` to sign in again.");
        }
    });

    match cli.command {
        Command::Schema => {}
        Command::Login { email, password } => {
            let auth = ctx.auth.login(&email, &password).await?;
            print_json(auth.user.as_ref().unwrap_or(&Value::Null))?;
        }
        Command::Register {
            email,
            password,
            full_name,
        } => {
            let auth = ctx.auth.register(&email, &password, &full_name).await?;
            print_json(auth.user.as_ref().unwrap_or(&Value::Null))?;
        }
        Command::Google { id_token } => {
            let auth = ctx.auth.login_with_google(&id_token).await?;
            print_json(auth.user.as_ref().unwrap_or(&Value::Null))?;
        }
        Command::Logout => ctx.auth.logout().await?,
        Command::Me => print_json(&ctx.auth.me().await?)?,
        Command::Status => println!("{:?}", ctx.auth.session().await?),
        Command::Get { endpoint, query } => {
            let mut options = RequestOptions::get();
            for pair in query {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| Error::Config(format!("query '{}' is not key=value", pair)))?;
                options = options.with_query(key, value);
            }
            print_json(&ctx.client.request(&endpoint, options).await?)?;
        }
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|e| Error::Decode(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}
