use std::{env, path::PathBuf, process, sync::Arc};

use graphprocs::{
    FullTextProcedures, MemoryIndexStore, NodeSpec, ProcConfig, ProcError, ProcMode,
    ProcedureRegistry, RelationshipSpec, SqliteNodeStore, TracingSink,
    client::CommandLineConfig,
    fulltext::{dump_indexes_to_path, load_indexes_from_path},
    register_fulltext_procedures, register_property_procedures,
};
use serde_json::{Map, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("{}", CommandLineConfig::help());
        return;
    }
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let cli = match CommandLineConfig::from_args(&arg_refs) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
    };

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
    };
    init_tracing(&config.log_filter);

    let host = match Host::open(&cli, config) {
        Ok(host) => host,
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    };

    if let Err(err) = host.run_command(&cli.command, &cli.command_args) {
        eprintln!("command failed: {err}");
        process::exit(1);
    }
}

/// Logs go to stderr so stdout stays machine readable.
fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

fn load_config(cli: &CommandLineConfig) -> Result<ProcConfig, ProcError> {
    match &cli.config {
        Some(path) => ProcConfig::from_path(path),
        None => Ok(ProcConfig::default()),
    }
}

struct Host {
    nodes: Arc<SqliteNodeStore>,
    indexes: Arc<MemoryIndexStore>,
    registry: ProcedureRegistry,
    index_file: Option<PathBuf>,
}

impl Host {
    fn open(cli: &CommandLineConfig, config: ProcConfig) -> Result<Self, ProcError> {
        let nodes = if cli.database == "memory" {
            SqliteNodeStore::open_in_memory()?
        } else {
            SqliteNodeStore::open(PathBuf::from(&cli.database))?
        };
        let nodes = Arc::new(nodes);
        let indexes = Arc::new(MemoryIndexStore::new());

        let index_file = cli.index_file.as_ref().map(PathBuf::from);
        if let Some(path) = index_file.as_ref().filter(|path| path.exists()) {
            let documents = load_indexes_from_path(indexes.as_ref(), path)?;
            debug!(path = %path.display(), documents, "loaded index snapshot");
        }

        let mut registry = ProcedureRegistry::new();
        register_property_procedures(&mut registry, nodes.clone(), &config)?;
        let procs = FullTextProcedures::new(nodes.clone(), indexes.clone(), TracingSink, config);
        register_fulltext_procedures(&mut registry, Arc::new(procs))?;

        Ok(Self {
            nodes,
            indexes,
            registry,
            index_file,
        })
    }

    fn run_command(&self, command: &str, args: &[String]) -> Result<(), ProcError> {
        match command {
            "status" => {
                let nodes = self.nodes.node_ids()?.len();
                println!("nodes={nodes} indexes={}", self.indexes.len());
                Ok(())
            }
            "procedures" => {
                for signature in self.registry.signatures() {
                    println!("{signature}");
                }
                Ok(())
            }
            "add-node" => self.add_node(args),
            "add-rel" => self.add_rel(args),
            "call" => self.call(args),
            other => Err(ProcError::invalid_input(format!("unknown command {other}"))),
        }
    }

    fn add_node(&self, args: &[String]) -> Result<(), ProcError> {
        let labels = args
            .first()
            .ok_or_else(|| ProcError::invalid_input("add-node requires labels"))?;
        let mut spec = NodeSpec::new(
            labels
                .split(',')
                .map(str::trim)
                .filter(|label| !label.is_empty()),
        );
        for (key, value) in parse_properties(args.get(1))? {
            spec = spec.property(key, value);
        }
        let id = self.nodes.insert_node(&spec)?;
        println!("{id}");
        Ok(())
    }

    fn add_rel(&self, args: &[String]) -> Result<(), ProcError> {
        let [from, to, rel_type, rest @ ..] = args else {
            return Err(ProcError::invalid_input(
                "add-rel requires <from> <to> <type>",
            ));
        };
        let spec = RelationshipSpec {
            from: parse_id(from)?,
            to: parse_id(to)?,
            rel_type: rel_type.clone(),
            properties: parse_properties(rest.first())?.into_iter().collect(),
        };
        let id = self.nodes.insert_relationship(&spec)?;
        println!("{id}");
        Ok(())
    }

    fn call(&self, args: &[String]) -> Result<(), ProcError> {
        let name = args
            .first()
            .ok_or_else(|| ProcError::invalid_input("call requires a procedure name"))?;
        let call_args = match args.get(1) {
            Some(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Array(items)) => items,
                Ok(_) => {
                    return Err(ProcError::invalid_input(
                        "procedure arguments must be a JSON array",
                    ));
                }
                Err(e) => return Err(ProcError::invalid_input(e.to_string())),
            },
            None => Vec::new(),
        };
        let records = self.registry.call(name, &call_args, ProcMode::Schema)?;
        for record in &records {
            let line =
                serde_json::to_string(record).map_err(|e| ProcError::query(e.to_string()))?;
            println!("{line}");
        }
        let mutating = self
            .registry
            .signature(name)
            .is_some_and(|signature| signature.mode > ProcMode::Read);
        if let (true, Some(path)) = (mutating, &self.index_file) {
            dump_indexes_to_path(self.indexes.as_ref(), path)?;
            info!(path = %path.display(), "saved index snapshot");
        }
        Ok(())
    }
}

fn parse_id(text: &str) -> Result<i64, ProcError> {
    text.parse()
        .map_err(|_| ProcError::invalid_input(format!("`{text}` is not a node id")))
}

fn parse_properties(text: Option<&String>) -> Result<Map<String, Value>, ProcError> {
    let Some(text) = text else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ProcError::invalid_input("properties must be a JSON object")),
        Err(e) => Err(ProcError::invalid_input(e.to_string())),
    }
}
