//! `pathnote` — CLI driver over the outline engine. Parses arguments,
//! invokes `Engine` operations, formats output, and maps errors to exit
//! codes (§7 / §6F of the design doc).

use std::{
    io::{self, Read, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use pathnote::{
    engine::{self, AddSpec, Engine, ListEntry, MoveTarget},
    error::Error,
    outline::DeleteMode,
    ports::{AsciiSlugifier, Base62IdEncoder, RealFileSystem},
    search::SearchFlags,
};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(author, version, about = "Hierarchical outline manager backed by filenames", long_about = None)]
struct Cli {
    /// Directory holding the outline's `.md` files.
    #[arg(long, global = true, default_value = ".")]
    directory: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Add a new node.
    Add {
        title: String,
        /// Parent node id; omit for a root-level node.
        #[arg(long)]
        parent: Option<String>,
        /// Insert relative to this sibling id instead of appending.
        #[arg(long)]
        sibling_of: Option<String>,
        /// Insert before `--sibling-of` (default when a sibling is given).
        #[arg(long, conflicts_with = "after")]
        before: bool,
        /// Insert after `--sibling-of`.
        #[arg(long, conflicts_with = "before")]
        after: bool,
    },

    /// List the outline as a tree.
    List {
        /// Restrict the listing to this node's subtree.
        subtree: Option<String>,
        #[arg(long)]
        show_doctypes: bool,
        #[arg(long)]
        show_files: bool,
        #[arg(long)]
        json: bool,
    },

    /// Move a node to a new parent or an explicit path.
    Move {
        id: String,
        /// A materialized path (digits and dashes) or a parent id.
        target: String,
    },

    /// Change a node's title.
    Rename {
        id: String,
        title: String,
    },

    /// Delete a node.
    Delete {
        id: String,
        #[arg(long, conflicts_with = "promote")]
        recursive: bool,
        #[arg(long, conflicts_with = "recursive")]
        promote: bool,
    },

    /// Renumber siblings at a level with even spacing.
    Compact {
        /// Compact the children of this node instead of the root level.
        subtree: Option<String>,
    },

    /// Validate (and optionally repair) the outline's integrity.
    Doctor {
        #[arg(long)]
        repair: bool,
    },

    /// Concatenate a doctype's bodies across a subtree.
    Compile {
        doctype: String,
        #[arg(long)]
        subtree: Option<String>,
        #[arg(long, default_value = "\n")]
        separator: String,
    },

    /// Scan document bodies for a regex or literal pattern.
    Search {
        pattern: String,
        #[arg(long)]
        subtree: Option<String>,
        #[arg(long, value_delimiter = ',')]
        doctypes: Option<Vec<String>>,
        #[arg(long)]
        case_sensitive: bool,
        #[arg(long)]
        dotall: bool,
        #[arg(long)]
        literal: bool,
        #[arg(long)]
        json: bool,
    },

    /// Manage a node's doctype files.
    Types {
        #[command(subcommand)]
        command: TypesCommand,
    },
}

#[derive(Debug, Subcommand)]
enum TypesCommand {
    /// List doctypes present on a node.
    List { id: String },
    /// Attach a new doctype to a node.
    Add { id: String, doctype: String },
    /// Detach a doctype from a node.
    Remove { id: String, doctype: String },
    /// Print a doctype's body to stdout.
    Read { id: String, doctype: String },
    /// Overwrite a doctype's body from stdin.
    Write { id: String, doctype: String },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = prepare_directory(&cli.directory) {
        eprintln!("Error: {err:#}");
        return ExitCode::from(2);
    }

    let fs = RealFileSystem;
    let id_encoder = Base62IdEncoder;
    let slugifier = AsciiSlugifier;
    let engine = Engine::new(&fs, cli.directory, &id_encoder, &slugifier);

    match run(&engine, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

/// Top-of-main glue: make sure the outline directory exists before the
/// engine ever tries to list it. Kept outside `Engine` (which never touches
/// anything but `*.md` files) and outside the `Error` taxonomy, since this
/// is argument-parsing-adjacent setup rather than a core operation.
fn prepare_directory(dir: &std::path::Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating outline directory {}", dir.display()))
}

fn run(engine: &Engine, command: Commands) -> Result<(), Error> {
    match command {
        Commands::Add {
            title,
            parent,
            sibling_of,
            before,
            after,
        } => {
            let spec = AddSpec {
                parent_id: parent,
                sibling_id: sibling_of,
                before,
                after,
            };
            let summary = engine.add(&title, &spec)?;
            println!("{} {} {}", summary.id, summary.path, summary.slug);
            Ok(())
        }

        Commands::List {
            subtree,
            show_doctypes,
            show_files,
            json,
        } => {
            let entries = engine.list(subtree.as_deref())?;
            if json {
                print_list_json(&entries, show_doctypes, show_files, engine.directory());
            } else {
                print_list_text(&entries, 0, show_doctypes);
            }
            Ok(())
        }

        Commands::Move { id, target } => {
            let target = engine::parse_move_target(&target)?;
            engine.move_node(&id, target)?;
            println!("moved {id}");
            Ok(())
        }

        Commands::Rename { id, title } => {
            engine.rename(&id, &title)?;
            println!("renamed {id}");
            Ok(())
        }

        Commands::Delete {
            id,
            recursive,
            promote,
        } => {
            let mode = if recursive {
                DeleteMode::Recursive
            } else if promote {
                DeleteMode::Promote
            } else {
                DeleteMode::Leaf
            };
            let summary = engine.delete(&id, mode)?;
            println!("deleted: {}", summary.deleted.join(", "));
            if !summary.promoted.is_empty() {
                println!("promoted: {}", summary.promoted.join(", "));
            }
            Ok(())
        }

        Commands::Compact { subtree } => {
            let count = engine.compact(subtree.as_deref())?;
            println!("renumbered {count} sibling(s)");
            Ok(())
        }

        Commands::Doctor { repair } => {
            let outcome = engine.doctor(repair)?;
            for violation in &outcome.report.violations {
                println!("{}", format_violation(violation));
            }
            if !outcome.repaired.is_empty() {
                for (id, doctype) in &outcome.repaired {
                    println!("repaired: {id} missing {doctype}");
                }
            }
            if outcome.report.is_valid() {
                println!("valid");
                Ok(())
            } else {
                Err(Error::Invalid(outcome.report.violations.len()))
            }
        }

        Commands::Compile {
            doctype,
            subtree,
            separator,
        } => {
            let text = engine.compile(&doctype, subtree.as_deref(), &separator)?;
            print!("{text}");
            io::stdout().flush().ok();
            Ok(())
        }

        Commands::Search {
            pattern,
            subtree,
            doctypes,
            case_sensitive,
            dotall,
            literal,
            json,
        } => {
            let flags = SearchFlags {
                case_sensitive,
                dotall,
                literal,
            };
            let matches = engine.search(&pattern, subtree.as_deref(), doctypes.as_deref(), flags)?;
            for m in &matches {
                if json {
                    let dto = MatchJson {
                        id: m.id.as_str(),
                        path: m.path.as_string(),
                        doctype: &m.doctype,
                        line: m.line_number,
                        text: &m.line,
                        span: [m.span.0, m.span.1],
                    };
                    println!("{}", serde_json::to_string(&dto).expect("Match serializes"));
                } else {
                    println!("{}:{}:{}: {}", m.id, m.path, m.line_number, m.line);
                }
            }
            Ok(())
        }

        Commands::Types { command } => run_types(engine, command),
    }
}

fn run_types(engine: &Engine, command: TypesCommand) -> Result<(), Error> {
    match command {
        TypesCommand::List { id } => {
            let mut doctypes = engine.types_list(&id)?;
            doctypes.sort();
            for doctype in doctypes {
                println!("{doctype}");
            }
            Ok(())
        }
        TypesCommand::Add { id, doctype } => {
            engine.types_add(&id, &doctype)?;
            println!("added {doctype} to {id}");
            Ok(())
        }
        TypesCommand::Remove { id, doctype } => {
            engine.types_remove(&id, &doctype)?;
            println!("removed {doctype} from {id}");
            Ok(())
        }
        TypesCommand::Read { id, doctype } => {
            let body = engine.types_read(&id, &doctype)?;
            print!("{body}");
            io::stdout().flush().ok();
            Ok(())
        }
        TypesCommand::Write { id, doctype } => {
            let mut body = String::new();
            io::stdin()
                .read_to_string(&mut body)
                .map_err(|e| Error::io(format!("<stdin for {id}/{doctype}>"), e))?;
            engine.types_write(&id, &doctype, &body)?;
            println!("wrote {doctype} for {id}");
            Ok(())
        }
    }
}

fn print_list_text(entries: &[ListEntry], depth: usize, show_doctypes: bool) {
    for entry in entries {
        let indent = "  ".repeat(depth);
        if show_doctypes {
            println!(
                "{indent}{} {} [{}] ({})",
                entry.path,
                entry.title,
                entry.doctypes.join(","),
                entry.id
            );
        } else {
            println!("{indent}{} {} ({})", entry.path, entry.title, entry.id);
        }
        print_list_text(&entry.children, depth + 1, show_doctypes);
    }
}

/// `ListEntry` plus whatever the `--show-doctypes`/`--show-files` flags ask
/// for, shaped for JSON output. Kept at the CLI layer rather than on
/// `ListEntry` itself, since the file-path projection is display-only.
#[derive(Serialize)]
struct ListEntryJson {
    id: String,
    path: String,
    title: String,
    slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    doctypes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<Vec<String>>,
    children: Vec<ListEntryJson>,
}

impl ListEntryJson {
    fn build(entry: &ListEntry, show_doctypes: bool, show_files: bool, dir: &std::path::Path) -> Self {
        ListEntryJson {
            id: entry.id.clone(),
            path: entry.path.clone(),
            title: entry.title.clone(),
            slug: entry.slug.clone(),
            doctypes: show_doctypes.then(|| entry.doctypes.clone()),
            files: show_files.then(|| {
                entry
                    .doctypes
                    .iter()
                    .map(|d| {
                        let filename = format!("{}_{}_{}_{}.md", entry.path, entry.id, d, entry.slug);
                        dir.join(filename).display().to_string()
                    })
                    .collect()
            }),
            children: entry
                .children
                .iter()
                .map(|c| ListEntryJson::build(c, show_doctypes, show_files, dir))
                .collect(),
        }
    }
}

fn print_list_json(entries: &[ListEntry], show_doctypes: bool, show_files: bool, dir: &std::path::Path) {
    let rendered: Vec<ListEntryJson> = entries
        .iter()
        .map(|e| ListEntryJson::build(e, show_doctypes, show_files, dir))
        .collect();
    println!("{}", serde_json::to_string(&rendered).expect("ListEntryJson serializes"));
}

/// One search match, shaped for `--json` output (a JSON-lines stream, one
/// object per matched line, rather than a single collected array, per §4.10's
/// lazy-sequence contract).
#[derive(Serialize)]
struct MatchJson<'a> {
    id: &'a str,
    path: String,
    doctype: &'a str,
    line: usize,
    text: &'a str,
    span: [usize; 2],
}

fn format_violation(v: &pathnote::validator::Violation) -> String {
    use pathnote::validator::Violation::*;
    match v {
        UnparseableFilename { filename, reason } => {
            format!("unparseable filename {filename:?}: {reason}")
        }
        DuplicateId { id, paths } => format!("duplicate id {id} at paths {}", paths.join(", ")),
        DuplicatePath { path, ids } => format!("duplicate path {path} claimed by ids {}", ids.join(", ")),
        MissingDoctype { id, doctype } => format!("node {id} missing required doctype {doctype:?}"),
        TitleMismatch { id, expected, found } => {
            format!("node {id} title/slug mismatch: expected slug {expected:?}, found {found:?}")
        }
        OrphanedPath { id, path } => format!("node {id} at {path} has no parent node (orphan)"),
    }
}
