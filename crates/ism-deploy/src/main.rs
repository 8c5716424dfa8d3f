use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use ism_config::IsmDocument;
use ism_deploy::{
    init_tracing, CacheSnapshot, CancellationHandle, DeploymentCache, Engine, EngineConfig,
    SimulatedDeployer,
};
use ism_registry::ChainRegistry;
use std::path::PathBuf;
use std::sync::Arc;

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .short('c')
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("ISM configuration document (.json, .yaml or .toml)")
}

fn registry_arg() -> Arg {
    Arg::new("registry")
        .long("registry")
        .short('r')
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Chain registry file")
}

fn chain_arg() -> Arg {
    Arg::new("chain")
        .long("chain")
        .required(true)
        .help("Chain to deploy on, by registry name")
}

fn engine_arg() -> Arg {
    Arg::new("engine")
        .long("engine")
        .value_parser(value_parser!(PathBuf))
        .help("Engine settings (TOML)")
}

fn cli() -> Command {
    Command::new("ism-deploy")
        .version(ism_config::VERSION)
        .about("Resolve and deploy Interchain Security Module configurations")
        .subcommand_required(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .default_value("info")
                .help("Log level for ism crates; RUST_LOG takes precedence"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("plan")
                .about("Print the deployment plan for a chain")
                .arg(config_arg())
                .arg(registry_arg())
                .arg(chain_arg())
                .arg(engine_arg()),
        )
        .subcommand(
            Command::new("deploy")
                .about("Deploy with the simulated deployer and print the result as JSON")
                .arg(config_arg())
                .arg(registry_arg())
                .arg(chain_arg())
                .arg(engine_arg())
                .arg(
                    Arg::new("cache")
                        .long("cache")
                        .value_parser(value_parser!(PathBuf))
                        .help("Cache snapshot to seed from and write back to"),
                )
                .arg(
                    Arg::new("concurrency")
                        .long("concurrency")
                        .value_parser(value_parser!(usize))
                        .help("Maximum concurrent deployments"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Bind and validate every node without choosing a chain")
                .arg(config_arg())
                .arg(registry_arg()),
        )
}

fn path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a PathBuf> {
    args.get_one::<PathBuf>(name)
        .with_context(|| format!("missing --{name}"))
}

fn engine(args: &ArgMatches) -> Result<Engine> {
    let registry_path = path(args, "registry")?;
    let registry = ChainRegistry::from_path(registry_path)
        .with_context(|| format!("loading registry {}", registry_path.display()))?;

    let mut config = match args.try_get_one::<PathBuf>("engine").ok().flatten() {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("loading engine settings {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(max) = args.try_get_one::<usize>("concurrency").ok().flatten() {
        config = config.with_max_concurrent_deployments(*max);
        config.validate()?;
    }

    Ok(Engine::new(registry, Arc::new(SimulatedDeployer::new())).with_config(config))
}

fn document(args: &ArgMatches) -> Result<IsmDocument> {
    let config_path = path(args, "config")?;
    IsmDocument::from_path(config_path)
        .with_context(|| format!("loading configuration {}", config_path.display()))
}

fn chain(args: &ArgMatches) -> Result<&str> {
    args.get_one::<String>("chain")
        .map(String::as_str)
        .context("missing --chain")
}

async fn deploy(args: &ArgMatches) -> Result<()> {
    let engine = engine(args)?;
    let document = document(args)?;
    let chain = chain(args)?;

    let cache = DeploymentCache::new();
    let cache_path = args.get_one::<PathBuf>("cache");
    if let Some(path) = cache_path.filter(|p| p.exists()) {
        let snapshot = CacheSnapshot::load(path)?;
        let seeded = cache.seed(snapshot.nodes).await?;
        tracing::info!("Seeded {} cached deployments from {}", seeded, path.display());
    }

    let cancel = CancellationHandle::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let outcome = engine
        .deploy_document(chain, &document, &cache, Some(cancel))
        .await;

    if let Some(path) = cache_path {
        cache.snapshot().save(path)?;
        tracing::info!("Wrote {} cached deployments to {}", cache.len(), path.display());
    }

    let result = outcome?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let level = matches
        .get_one::<String>("log-level")
        .map_or("info", String::as_str);
    init_tracing(level, matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("plan", args)) => {
            let engine = engine(args)?;
            let bound = engine.bind(&document(args)?)?;
            let plan = engine.plan(chain(args)?, &bound.root, &bound.library)?;
            println!("{plan}");
        }
        Some(("deploy", args)) => deploy(args).await?,
        Some(("validate", args)) => {
            let engine = engine(args)?;
            let plan = engine.validate(&document(args)?)?;
            println!("valid: {} modules to deploy", plan.len());
        }
        _ => unreachable!("subcommand_required"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn deploy_accepts_cache_and_concurrency() {
        let matches = cli()
            .try_get_matches_from([
                "ism-deploy",
                "deploy",
                "--config",
                "ism.yaml",
                "--registry",
                "chains.yaml",
                "--chain",
                "test1",
                "--cache",
                "cache.json",
                "--concurrency",
                "2",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "deploy");
        assert_eq!(args.get_one::<usize>("concurrency"), Some(&2));
        assert_eq!(chain(args).unwrap(), "test1");
    }

    #[test]
    fn validate_requires_registry() {
        let err = cli()
            .try_get_matches_from(["ism-deploy", "validate", "--config", "ism.yaml"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
