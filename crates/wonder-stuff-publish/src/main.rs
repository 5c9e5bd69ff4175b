//! Publish a placeholder release to reserve a new package name.

mod placeholder;
mod publish;

use clap::Parser;
use wonder_stuff_core::KindError;

#[derive(Parser, Debug)]
#[command(name = "publish-new-package")]
#[command(about = "Publish a placeholder package to reserve its name")]
#[command(version)]
struct Cli {
    /// Name of the package to reserve, optionally scoped (`@scope/name`).
    package_name: String,

    /// Leave the generated placeholder directory in place.
    #[arg(long)]
    no_cleanup: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = i32::from(e.use_stderr());
            // Help and version output go to stdout and are not failures.
            let _ = e.print();
            std::process::exit(code);
        }
    };

    if let Err(e) = run(&cli).await {
        eprintln!("✗ Error: {}", e.message());
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<(), KindError> {
    publish::validate_package_name(&cli.package_name)?;
    let token = publish::prompt_for_token().await?;
    publish::validate_token(&token)?;

    let dir = placeholder::create(&cli.package_name, &token)?;
    let result = publish::npm_publish(dir.path()).await;

    if cli.no_cleanup {
        let kept = dir.keep();
        println!("Placeholder left at {}", kept.display());
    }

    result?;
    println!("✓ Published placeholder for {}", cli.package_name);
    Ok(())
}
