use anyhow::{Context, Error};
use hostel_client::{endpoints, ApiClient, Config, SessionVerifier};
use std::{path::PathBuf, time::Duration};
use structopt::StructOpt;
use url::Url;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Args::from_args();

    log::debug!("Starting application with {:#?}", args);

    let client = ApiClient::from_config(args.config()?)
        .context("Unable to create the API client")?;

    match args.cmd {
        Command::Health => {
            let retries = client.config().max_retries;
            match endpoints::check_health(&client, retries).await {
                Ok(health) => {
                    log::info!("{} ({})", health.message, health.status)
                },
                Err(e) => log::warn!("The server is unavailable: {}", e),
            }
        },
        Command::Login { username, password } => {
            let session =
                endpoints::login(&client, &username, &password).await?;
            log::info!(
                "Logged in as {} ({:?})",
                session.user.username,
                session.user.role
            );
        },
        Command::Register { username, password } => {
            let registration =
                endpoints::register(&client, &username, &password).await?;
            log::info!("{}: {}", registration.message, registration.username);
        },
        Command::Verify => {
            let verifier = SessionVerifier::new(client.clone());
            let outcome = verifier.verify_on_load().await;
            verifier.stop_timer();

            match outcome.reason() {
                Some(reason) => log::info!(
                    "Session valid: {} ({})",
                    outcome.is_valid(),
                    reason
                ),
                None => log::info!("Session valid: {}", outcome.is_valid()),
            }
        },
        Command::Logout => endpoints::logout(&client)?,
        Command::Users => {
            for (username, user) in endpoints::get_users(&client).await? {
                log::info!(
                    "{} => {:?} {:?} (expires {:?})",
                    username,
                    user.role,
                    user.status,
                    user.access_expires
                );
            }
        },
        Command::Rooms => {
            let snapshot = endpoints::get_rooms(&client).await?;
            log::info!("{}", serde_json::to_string_pretty(&snapshot)?);
        },
        Command::Staff => {
            for (id, employee) in endpoints::get_staff(&client).await? {
                log::info!("{} => {}", id, employee);
            }
        },
    }

    Ok(())
}

#[derive(Debug, StructOpt)]
struct Args {
    #[structopt(
        long = "origin",
        help = "The URL the frontend is served from, used to pick a backend"
    )]
    origin: Option<Url>,
    #[structopt(
        long = "base-url",
        help = "Talk to this backend instead of guessing from the origin"
    )]
    base_url: Option<Url>,
    #[structopt(
        long = "session-file",
        parse(from_os_str),
        help = "Where to remember the session between runs"
    )]
    session_file: Option<PathBuf>,
    #[structopt(long = "retries", help = "How many times to retry a request")]
    retries: Option<u32>,
    #[structopt(
        long = "timeout-secs",
        help = "How long to wait for a single attempt"
    )]
    timeout_secs: Option<u64>,
    #[structopt(subcommand)]
    cmd: Command,
}

impl Args {
    fn config(&self) -> Result<Config, Error> {
        let mut config = match self.base_url {
            Some(ref url) => Config::with_base_url(url.clone()),
            None => Config::for_origin(self.origin.as_ref()),
        }
        .context("Invalid backend URL")?;

        config.storage_path = self.session_file.clone();
        if let Some(retries) = self.retries {
            config.max_retries = retries;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Check whether the backend is up.
    Health,
    /// Log in and remember the session.
    Login {
        #[structopt(short = "u", long = "username", help = "Your username")]
        username: String,
        #[structopt(short = "p", long = "password", help = "Your password")]
        password: String,
    },
    /// Ask for a new account.
    Register {
        #[structopt(short = "u", long = "username")]
        username: String,
        #[structopt(short = "p", long = "password")]
        password: String,
    },
    /// Check the saved session with the server.
    Verify,
    /// Forget the saved session.
    Logout,
    /// List every account (administrators only).
    Users,
    /// Dump the rooms, beds and residents.
    Rooms,
    /// List the staff.
    Staff,
}
