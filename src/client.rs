#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLineConfig {
    pub database: String,
    pub index_file: Option<String>,
    pub config: Option<String>,
    pub command: String,
    pub command_args: Vec<String>,
}

impl CommandLineConfig {
    pub fn from_args(args: &[&str]) -> Result<Self, String> {
        let mut database = String::from("memory");
        let mut index_file = None;
        let mut config = None;
        let mut positional = Vec::new();
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            // Everything after the command belongs to it, including JSON
            // arguments that start with `-`.
            if !positional.is_empty() {
                positional.push(arg.to_string());
                continue;
            }
            match *arg {
                "--db" | "--database" => {
                    database = iter
                        .next()
                        .ok_or_else(|| "--db requires a value".to_string())?
                        .to_string();
                }
                "--index-file" => {
                    index_file = Some(
                        iter.next()
                            .ok_or_else(|| "--index-file requires a value".to_string())?
                            .to_string(),
                    );
                }
                "--config" => {
                    config = Some(
                        iter.next()
                            .ok_or_else(|| "--config requires a value".to_string())?
                            .to_string(),
                    );
                }
                other if other.starts_with('-') => {
                    return Err(format!("unknown flag {other}"));
                }
                _ => positional.push(arg.to_string()),
            }
        }
        let mut positional = positional.into_iter();
        let command = positional.next().unwrap_or_else(|| String::from("status"));
        Ok(Self {
            database,
            index_file,
            config,
            command,
            command_args: positional.collect(),
        })
    }

    pub fn help() -> &'static str {
        "Usage: graphprocs [--db memory|PATH] [--index-file PATH] [--config PATH] <command>\n\
         \n\
         Commands:\n  \
           status                                   node and index counts\n  \
           procedures                               list registered procedure signatures\n  \
           add-node <labels,csv> [props-json]       insert a node, prints its id\n  \
           add-rel <from> <to> <type> [props-json]  insert a relationship, prints its id\n  \
           call <procedure> [args-json-array]       run a procedure, one JSON record per line\n"
    }
}
