//! # sitestack
//!
//! ```bash
//! # print the template that would be deployed
//! sitestack synth
//!
//! # show what would change against the deployed stack
//! sitestack plan
//!
//! # create or update the stack, then publish the build output
//! sitestack deploy
//!
//! # upload assets and invalidate the cache without touching the stack
//! sitestack publish
//!
//! # delete the stack. The bucket is retained.
//! sitestack destroy
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use clap::{Parser, Subcommand};
use sitestack::config::CONFIG_FILE_NAME;
use sitestack::context::context_path_for;
use sitestack::{
    diff_templates, resolve_hosted_zone, CloudFrontInvalidator, LookupContext, Route53ZoneLookup,
    S3ObjectStore, SiteConfig, SitePlan, StackDeployer, StackOutputs, StaticWebsite, Template,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sitestack", about = "Deploy a static website behind CloudFront", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// path to site.toml. By default the closest site.toml
    /// in the current directory or one of its parents is used.
    #[arg(short, long, global = true, env = "SITESTACK_CONFIG")]
    config: Option<PathBuf>,

    /// overrides stack_id
    #[arg(long, global = true, env = "SITESTACK_STACK_ID")]
    stack_id: Option<String>,

    /// overrides root_domain
    #[arg(long, global = true, env = "SITESTACK_DOMAIN")]
    domain: Option<String>,

    /// overrides build_output_path
    #[arg(long, global = true, env = "SITESTACK_BUILD_OUTPUT")]
    build_output_path: Option<PathBuf>,

    /// overrides region
    #[arg(long, global = true, env = "SITESTACK_REGION")]
    region: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the synthesized template
    Synth {
        /// write the template here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Diff the synthesized template against the deployed stack
    Plan,
    /// Create or update the stack, then publish the build output
    Deploy {
        /// only apply the stack
        #[arg(long)]
        skip_publish: bool,
    },
    /// Upload the build output and invalidate the distribution
    Publish,
    /// Delete the stack
    Destroy,
}

/// given a search dir, see if site.toml exists in this dir, and if so return
/// the path to it. If not found, back up 1 dir at a time (limit 5 times)
fn find_closest_config(mut search_dir: PathBuf) -> Option<PathBuf> {
    for _ in 0..5 {
        search_dir.push(CONFIG_FILE_NAME);
        if search_dir.is_file() {
            return Some(search_dir);
        }
        search_dir.pop();
        if !search_dir.pop() {
            break;
        }
    }
    None
}

fn apply_overrides(config: &mut SiteConfig, cli: &Cli) {
    if let Some(stack_id) = &cli.stack_id {
        config.stack_id = stack_id.clone();
    }
    if let Some(domain) = &cli.domain {
        config.root_domain = domain.clone();
    }
    if let Some(path) = &cli.build_output_path {
        config.build_output_path = path.clone();
    }
    if let Some(region) = &cli.region {
        config.region = region.clone();
    }
}

/// returns the config and the path of the lookup context that goes with it.
fn load_config(cli: &Cli) -> Result<(SiteConfig, PathBuf)> {
    let config_path = match &cli.config {
        Some(p) => Some(p.clone()),
        None => {
            let currdir = std::env::current_dir().context("Failed to get current directory")?;
            find_closest_config(currdir)
        }
    };
    let (mut config, context_path) = match config_path {
        Some(path) => {
            let config = SiteConfig::load(&path)
                .with_context(|| format!("Failed to load config from {:?}", path))?;
            (config, context_path_for(&path))
        }
        None => match (&cli.stack_id, &cli.domain) {
            (Some(stack_id), Some(domain)) => (SiteConfig::new(stack_id, domain), PathBuf::from(sitestack::CONTEXT_FILE_NAME)),
            _ => bail!("No {CONFIG_FILE_NAME} found. Create one, or pass --stack-id and --domain"),
        },
    };
    apply_overrides(&mut config, cli);
    config.validate().context("Invalid configuration")?;
    Ok((config, context_path))
}

async fn plan_site(config: &SiteConfig, context_path: &Path, sdk_config: &SdkConfig) -> Result<SitePlan> {
    let mut context = LookupContext::load(context_path)?;
    let before = context.clone();
    let lookup = Route53ZoneLookup::new(aws_sdk_route53::Client::new(sdk_config));
    let zone = resolve_hosted_zone(config, &mut context, &lookup).await
        .with_context(|| format!("Failed to find the hosted zone of {}", config.root_domain))?;
    if context != before {
        context.save(context_path)?;
        info!(path = ?context_path, "saved lookup context");
    }
    let plan = StaticWebsite::new(config.clone(), zone)?.synthesize()?;
    Ok(plan)
}

fn print_outputs(outputs: &StackOutputs) {
    for (key, value) in outputs.iter() {
        println!("{key} = {value}");
    }
}

async fn publish(plan: &SitePlan, sdk_config: &SdkConfig, outputs: &StackOutputs) -> Result<()> {
    let store = S3ObjectStore::new(aws_sdk_s3::Client::new(sdk_config));
    let invalidator = CloudFrontInvalidator::new(aws_sdk_cloudfront::Client::new(sdk_config));
    let report = plan.deployment.run(&store, &invalidator, outputs).await
        .context("Failed to publish assets")?;
    info!(
        uploaded = report.uploaded,
        deleted = report.deleted,
        caller_reference = %report.caller_reference,
        "published"
    );
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let (config, context_path) = load_config(&cli)?;
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .load()
        .await;
    let deployer = StackDeployer::new(aws_sdk_cloudformation::Client::new(&sdk_config));

    match cli.command {
        Commands::Synth { out } => {
            let plan = plan_site(&config, &context_path, &sdk_config).await?;
            info!(order = ?plan.synthesized.order, "apply order");
            let body = plan.template_body().context("Failed to serialize template")?;
            match out {
                Some(path) => {
                    std::fs::write(&path, body + "\n")
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    info!(path = ?path, "wrote template");
                }
                None => println!("{body}"),
            }
        }
        Commands::Plan => {
            let plan = plan_site(&config, &context_path, &sdk_config).await?;
            let deployed = deployer.deployed_template(plan.stack_name()).await?;
            if deployed.is_none() {
                println!("Stack {} does not exist yet", plan.stack_name());
            }
            let deployed = deployed.unwrap_or_else(Template::default);
            print!("{}", diff_templates(&deployed, &plan.synthesized.template));
        }
        Commands::Deploy { skip_publish } => {
            let plan = plan_site(&config, &context_path, &sdk_config).await?;
            let body = plan.template_body().context("Failed to serialize template")?;
            let outputs = deployer.deploy(plan.stack_name(), &body, &plan.parameters).await?;
            print_outputs(&outputs);
            if !skip_publish {
                publish(&plan, &sdk_config, &outputs).await?;
            }
        }
        Commands::Publish => {
            let plan = plan_site(&config, &context_path, &sdk_config).await?;
            let outputs = deployer.stack_outputs(plan.stack_name()).await?;
            publish(&plan, &sdk_config, &outputs).await?;
        }
        Commands::Destroy => {
            deployer.delete_stack(config.stack_name()).await?;
            warn!(
                bucket = %sitestack::bucket_name_for(&config.stack_id),
                "the bucket is retained and must be emptied and deleted by hand"
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // a missing .env is fine
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    run(Cli::parse()).await
}
