//! colstore CLI Client
//!
//! Command-line interface for administering a colstore server.

use clap::{Parser, Subcommand};
use colstore::client::AdminClient;

/// colstore CLI
#[derive(Parser, Debug)]
#[command(name = "colstore-cli")]
#[command(about = "Administer collections on a colstore server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a collection
    Create {
        /// Collection name
        name: String,

        /// Number of partitions
        partitions: String,
    },

    /// List collections and their partition counts
    List,

    /// Rename a collection
    Rename {
        /// Current name
        old: String,

        /// New name
        new: String,
    },

    /// Drop a collection
    Drop {
        /// Collection name
        name: String,
    },

    /// Verify a collection's stored data and discard corrupt records
    Scrub {
        /// Collection name
        name: String,
    },

    /// Change the number of partitions of a collection
    Repartition {
        /// Collection name
        name: String,

        /// New number of partitions
        partitions: String,
    },

    /// Flush all buffered data to disk
    Flush,

    /// Print the server version
    Version,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let client = AdminClient::new(&args.server);

    let result = match args.command {
        Commands::Create { name, partitions } => client.create(&name, &partitions).await,
        Commands::List => client.list().await.map(|listing| {
            for (name, summary) in listing {
                println!("{}\t{} partition(s)", name, summary.partitions);
            }
        }),
        Commands::Rename { old, new } => client.rename(&old, &new).await,
        Commands::Drop { name } => client.drop_collection(&name).await,
        Commands::Scrub { name } => client.scrub(&name).await,
        Commands::Repartition { name, partitions } => {
            client.repartition(&name, &partitions).await
        }
        Commands::Flush => client.flush().await,
        Commands::Version => client.version().await.map(|v| println!("{}", v)),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
