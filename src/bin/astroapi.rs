//! CLI binary for the astroapi client.
//!
//! Usage: astroapi search "title:\"dark matter\"" --limit 10

#[cfg(feature = "cli")]
mod cli {
    use astroapi::fields::{self, Fields};
    use astroapi::{
        AdsClient, Article, Author, ClientConfig, ExportFormat, Journal, Libraries, Library,
        LibraryEdit, MetricsKind, PdfSource, SearchOptions, SharedBackend,
    };
    use clap::{Parser, Subcommand};
    use serde_json::Value;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[derive(Parser)]
    #[command(name = "astroapi", about = "NASA ADS / SciX API client", version)]
    struct Cli {
        /// API token (overrides SCIX_API_TOKEN / ADS_API_TOKEN env var)
        #[arg(long, global = true)]
        token: Option<String>,

        /// Output format
        #[arg(long, global = true, default_value = "table")]
        output: OutputFormat,

        /// Verbose logging (-v debug, -vv trace)
        #[arg(short, long, global = true, action = clap::ArgAction::Count)]
        verbose: u8,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Clone, Copy, clap::ValueEnum)]
    enum OutputFormat {
        Table,
        Json,
    }

    #[derive(Clone, Copy, clap::ValueEnum)]
    enum Source {
        Arxiv,
        Publisher,
        Ads,
    }

    impl From<Source> for PdfSource {
        fn from(source: Source) -> Self {
            match source {
                Source::Arxiv => PdfSource::ArXiv,
                Source::Publisher => PdfSource::Publisher,
                Source::Ads => PdfSource::Ads,
            }
        }
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Search the ADS database
        Search {
            /// Search query (ADS syntax)
            query: String,
            /// Fields to return (comma-separated)
            #[arg(short, long)]
            fields: Option<String>,
            /// Filter query
            #[arg(long)]
            fq: Option<String>,
            /// Maximum results (-1 for all)
            #[arg(short, long, default_value = "10", allow_hyphen_values = true)]
            limit: i64,
            /// Records per request
            #[arg(long, default_value_t = astroapi::paginate::DEFAULT_PAGE_SIZE)]
            page_size: usize,
            /// Records of the previous page re-read by each request
            #[arg(long, default_value_t = astroapi::paginate::DEFAULT_PAGE_OVERLAP)]
            overlap: usize,
        },
        /// Show one record
        Show {
            /// Bibcode, DOI or arXiv id
            identifier: String,
            /// Extra fields to load
            #[arg(short, long)]
            field: Vec<String>,
        },
        /// Show papers referenced by a paper
        Refs {
            /// Bibcode
            bibcode: String,
        },
        /// Show papers that cite a paper
        Cites {
            /// Bibcode
            bibcode: String,
        },
        /// Export papers in citation format
        Export {
            /// Bibcodes to export
            bibcodes: Vec<String>,
            /// Export format
            #[arg(short, long, default_value = "bibtex")]
            format: String,
        },
        /// Get citation metrics for papers
        Metrics {
            /// Bibcodes
            bibcodes: Vec<String>,
        },
        /// Resolve links for a paper
        Links {
            /// Bibcode
            bibcode: String,
            /// Link type (esource, data, citation, reference, coreads)
            #[arg(short, long)]
            link_type: Option<String>,
        },
        /// Download the full text of a paper
        Pdf {
            /// Bibcode
            bibcode: String,
            #[arg(short, long, value_enum, default_value = "arxiv")]
            source: Source,
            /// Target file or directory
            #[arg(short, long)]
            dest: Option<PathBuf>,
        },
        /// Show the API quota
        Limits,
        /// Manage personal libraries
        #[command(subcommand)]
        Libraries(LibraryCommand),
    }

    #[derive(Subcommand)]
    enum LibraryCommand {
        /// List your libraries
        List,
        /// Show the papers in a library
        Show {
            /// Library name
            name: String,
        },
        /// Create a library
        Create {
            name: String,
            #[arg(short, long, default_value = "")]
            description: String,
            #[arg(long)]
            public: bool,
            /// Initial bibcodes
            bibcodes: Vec<String>,
        },
        /// Rename or describe a library
        Edit {
            name: String,
            #[arg(long)]
            rename: Option<String>,
            #[arg(short, long)]
            description: Option<String>,
            #[arg(long)]
            public: Option<bool>,
        },
        /// Delete a library
        Delete {
            name: String,
        },
        /// Add bibcodes to a library
        Add {
            name: String,
            bibcodes: Vec<String>,
        },
        /// Remove bibcodes from a library
        Remove {
            name: String,
            bibcodes: Vec<String>,
        },
    }

    fn init_logging(verbose: u8) {
        use tracing_subscriber::EnvFilter;

        let default = match verbose {
            0 => "warn",
            1 => "astroapi=debug",
            _ => "astroapi=trace",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    fn make_client(token: Option<String>) -> astroapi::error::Result<AdsClient> {
        match token {
            Some(t) => {
                let mut config = ClientConfig::from_env().unwrap_or_else(|_| ClientConfig::new(""));
                config.token = t;
                AdsClient::from_config(config)
            }
            None => AdsClient::from_env(),
        }
    }

    fn text(record: &Fields, field: &str) -> String {
        match record.get(field) {
            Some(Value::Array(items)) => items.first().and_then(Value::as_str).unwrap_or("").to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    fn truncate(s: &str, max: usize) -> String {
        if s.chars().count() > max {
            let cut: String = s.chars().take(max - 3).collect();
            format!("{}...", cut)
        } else {
            s.to_string()
        }
    }

    fn print_records_table(records: &[Fields]) {
        use comfy_table::{ContentArrangement, Table};

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Bibcode", "Year", "First Author", "Title"]);

        for record in records {
            let first_author = Author::from_ads_format(&text(record, "author")).family_name;
            table.add_row(vec![
                text(record, "bibcode"),
                text(record, "year"),
                first_author,
                truncate(&text(record, "title"), 60),
            ]);
        }

        println!("{table}");
    }

    fn print_records(output: OutputFormat, heading: &str, records: &[Fields]) -> astroapi::error::Result<()> {
        match output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
            OutputFormat::Table => {
                println!("{}", heading);
                print_records_table(records);
            }
        }
        Ok(())
    }

    fn journal_records(journal: &Journal) -> Vec<Fields> {
        journal.iter().map(|a| a.fields().clone()).collect()
    }

    fn find_library<'a>(libraries: &'a mut Libraries, name: &str) -> astroapi::error::Result<&'a mut Library> {
        libraries
            .get_mut(name)
            .ok_or_else(|| astroapi::AdsError::NotFound(format!("library {}", name)))
    }

    async fn run_libraries(
        client: &AdsClient,
        backend: SharedBackend,
        output: OutputFormat,
        command: LibraryCommand,
    ) -> astroapi::error::Result<()> {
        let mut libraries = Libraries::fetch(client, backend).await?;
        match command {
            LibraryCommand::List => {
                let listed: Vec<_> = libraries.iter().map(Library::metadata).collect();
                match output {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listed)?),
                    OutputFormat::Table => {
                        let mut table = comfy_table::Table::new();
                        table.set_header(vec!["Name", "Id", "Papers", "Public"]);
                        for meta in listed {
                            table.add_row(vec![
                                meta.name.clone(),
                                meta.id.clone(),
                                meta.num_documents.to_string(),
                                meta.public.to_string(),
                            ]);
                        }
                        println!("{table}");
                    }
                }
            }
            LibraryCommand::Show { name } => {
                let library = find_library(&mut libraries, &name)?;
                library.update(client).await?;
                let journal = library.journal_mut();
                for field in ["title", "year", "author"] {
                    journal.field(field).await?;
                }
                let records = journal_records(journal);
                print_records(output, &format!("{}:", name), &records)?;
            }
            LibraryCommand::Create { name, description, public, bibcodes } => {
                let bibcodes: Vec<&str> = bibcodes.iter().map(String::as_str).collect();
                let library = libraries
                    .create(client, &name, &description, public, &bibcodes)
                    .await?;
                println!("Created {} ({})", library, library.id());
            }
            LibraryCommand::Edit { name, rename, description, public } => {
                let edit = LibraryEdit { name: rename, description, public };
                find_library(&mut libraries, &name)?.edit(client, &edit).await?;
            }
            LibraryCommand::Delete { name } => {
                let removed = libraries.pop(client, &name).await?;
                println!("Deleted {} ({})", removed, removed.id());
            }
            LibraryCommand::Add { name, bibcodes } => {
                let bibcodes: Vec<&str> = bibcodes.iter().map(String::as_str).collect();
                find_library(&mut libraries, &name)?
                    .add_bibcodes(client, &bibcodes)
                    .await?;
            }
            LibraryCommand::Remove { name, bibcodes } => {
                let bibcodes: Vec<&str> = bibcodes.iter().map(String::as_str).collect();
                find_library(&mut libraries, &name)?.pop(client, &bibcodes).await?;
            }
        }
        Ok(())
    }

    pub async fn run() -> astroapi::error::Result<()> {
        let cli = Cli::parse();
        init_logging(cli.verbose);
        let client = Arc::new(make_client(cli.token)?);
        let backend: SharedBackend = client.clone();

        match cli.command {
            Commands::Search {
                query,
                fields: field_list,
                fq,
                limit,
                page_size,
                overlap,
            } => {
                let mut options = SearchOptions::default()
                    .with_signed_limit(limit)
                    .with_page_size(page_size)
                    .with_overlap(overlap);
                if let Some(list) = field_list {
                    options = options.with_fields(fields::parse_field_list(&list));
                }
                if let Some(fq) = fq {
                    options = options.with_fq(fq);
                }

                let mut pages = client.query(&query, options)?;
                let mut records = Vec::new();
                while let Some(record) = pages.next().await {
                    records.push(record?);
                }
                let total = pages
                    .total()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".into());
                let heading = format!("Showing {} of {} results:", records.len(), total);
                print_records(cli.output, &heading, &records)?;
            }

            Commands::Show { identifier, field } => {
                let mut article = Article::from_identifier(backend, &identifier).await?;
                for name in &field {
                    article.get(name).await?;
                }
                match cli.output {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(article.fields())?)
                    }
                    OutputFormat::Table => {
                        let name = article.name().await?;
                        println!("{} ({})", article, name);
                        if let Some(title) = article.title().await? {
                            println!("{}", title);
                        }
                        if let Some(url) = article.ads_url() {
                            println!("{}", url);
                        }
                        for (key, value) in article.fields() {
                            if field.contains(key) {
                                println!("{}: {}", key, value);
                            }
                        }
                    }
                }
            }

            Commands::Refs { bibcode } => {
                let mut article = Article::new(backend, bibcode.clone());
                let records = journal_records(article.references().await?);
                print_records(cli.output, &format!("References of {}:", bibcode), &records)?;
            }

            Commands::Cites { bibcode } => {
                let mut article = Article::new(backend, bibcode.clone());
                let records = journal_records(article.citations().await?);
                print_records(cli.output, &format!("Citations of {}:", bibcode), &records)?;
            }

            Commands::Export { bibcodes, format } => {
                let fmt = ExportFormat::from_str_loose(&format).unwrap_or(ExportFormat::BibTeX);
                let journal = Journal::from_bibcodes(backend, bibcodes);
                println!("{}", journal.export().format(&client, fmt).await?);
            }

            Commands::Metrics { bibcodes } => {
                let journal = Journal::from_bibcodes(backend, bibcodes);
                let kinds = [MetricsKind::Basic, MetricsKind::Citations, MetricsKind::Indicators];
                let metrics = journal.metrics().fetch(&client, &kinds).await?;
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            }

            Commands::Links { bibcode, link_type } => {
                let result = client.resolve_links(&bibcode, link_type.as_deref()).await?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            }

            Commands::Pdf { bibcode, source, dest } => {
                let article = Article::new(backend, bibcode);
                let path = article
                    .pdf()?
                    .download(&client, source.into(), dest.as_deref())
                    .await?;
                println!("Saved {}", path.display());
            }

            Commands::Limits => {
                // Any request refreshes the quota headers.
                let options = SearchOptions::default().with_fields(["bibcode"]).with_limit(1);
                client.query("*:*", options)?.collect_all().await?;
                let limits = client.rate_limits().await;
                match cli.output {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&limits)?),
                    OutputFormat::Table => {
                        let show = |v: Option<u64>| v.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
                        println!("limit:     {}", show(limits.limit));
                        println!("remaining: {}", show(limits.remaining));
                        println!("reset:     {}", show(limits.reset));
                    }
                }
            }

            Commands::Libraries(command) => {
                run_libraries(&client, backend, cli.output, command).await?;
            }
        }

        Ok(())
    }
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature. Build with: cargo build --features cli");
    std::process::exit(1);
}
