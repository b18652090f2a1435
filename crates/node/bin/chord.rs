use chord_node::config::Config;
use chord_node::config::DEFAULT_CONFIG_PATH;
use chord_node::logging::init_logging;
use chord_node::logging::LogLevel;
use chord_node::simulation::RingSimulation;
use chord_node::util::build_version;
use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(about, version, author)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, default_value_t = LogLevel::Info, value_enum, env)]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Command {
    #[command(about = "Writes a default ring configuration.")]
    Init(InitCommand),
    #[command(
        about = "Builds the configured ring in process, verifies it and prints every member."
    )]
    Simulate(SimulateCommand),
    #[command(about = "Builds the configured ring and resolves the owner of each key.")]
    Lookup(LookupCommand),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[arg(
        long,
        short = 'c',
        env,
        default_value = DEFAULT_CONFIG_PATH,
        help = "Config file location"
    )]
    pub config: String,
}

#[derive(Args, Debug)]
struct InitCommand {
    #[arg(
        long,
        default_value = DEFAULT_CONFIG_PATH,
        help = "The location of config file"
    )]
    pub location: String,

    #[arg(long, help = "Width of the identifier space, 1 to 160")]
    pub id_bits: Option<u16>,
}

#[derive(Args, Debug)]
struct SimulateCommand {
    #[command(flatten)]
    config_args: ConfigArgs,

    #[arg(long, help = "Skip the ring check after each join")]
    pub no_verify: bool,
}

#[derive(Args, Debug)]
struct LookupCommand {
    #[command(flatten)]
    config_args: ConfigArgs,

    #[arg(help = "Keys to resolve. If not provided, use lookups in config file")]
    pub keys: Vec<String>,
}

async fn build_ring(config: &Config) -> anyhow::Result<RingSimulation> {
    let sim = RingSimulation::from_config(config)?;
    sim.bootstrap(config.contact).await?;
    Ok(sim)
}

async fn simulate_run(args: SimulateCommand) -> anyhow::Result<()> {
    let mut config = Config::read_fs(args.config_args.config.as_str())?;
    if args.no_verify {
        config.verify = false;
    }
    let sim = build_ring(&config).await?;
    sim.verify()?;
    println!("{}", serde_json::to_string_pretty(&sim.inspect())?);

    for key in config.lookups.iter() {
        let report = sim.lookup(key).await?;
        println!("{}", serde_json::to_string(&report)?);
    }
    Ok(())
}

async fn lookup_run(args: LookupCommand) -> anyhow::Result<()> {
    let config = Config::read_fs(args.config_args.config.as_str())?;
    let keys = if args.keys.is_empty() {
        config.lookups.clone()
    } else {
        args.keys
    };
    let sim = build_ring(&config).await?;
    for key in keys.iter() {
        let report = sim.lookup(key).await?;
        println!("{} -> {} ({})", report.key, report.owner, report.id);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_level);
    tracing::debug!("chord {}", build_version());

    match cli.command {
        Command::Init(args) => {
            let mut config = Config::default();
            if let Some(bits) = args.id_bits {
                config.id_bits = bits;
            }
            config.validate()?;
            let p = config.write_fs(args.location.as_str())?;
            println!("Your config file has saved to: {}", p);
            Ok(())
        }
        Command::Simulate(args) => simulate_run(args).await,
        Command::Lookup(args) => lookup_run(args).await,
    }
}
