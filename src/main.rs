//! wyrm CLI - content-addressed object store with a git-like commit graph

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wyrm::ops::{add, cat_file, commit, hash_object, log, ls_tree};
use wyrm::refs::{
    checkout, create_branch, create_tag, current_branch, delete_branch, list_branches,
    list_branches_matching, list_tags, HEAD,
};
use wyrm::{read_commit, resolve_revision, Object, ObjectKind, Repo};

#[derive(Parser)]
#[command(name = "wyrm")]
#[command(about = "content-addressed object store with a git-like commit graph")]
#[command(version)]
struct Cli {
    /// run as if started in this directory: repository discovery starts
    /// here and relative path arguments are resolved against it
    #[arg(short = 'C', long, default_value = ".", global = true)]
    repo: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// initialize a new repository
    Init {
        /// worktree to create the repository in
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// compute an object id for a file, optionally storing it
    HashObject {
        /// store the object in the repository
        #[arg(short, long)]
        write: bool,

        /// object type (blob, tree, commit)
        #[arg(short = 't', long = "type", default_value = "blob")]
        object_type: String,

        /// file to hash
        path: PathBuf,
    },

    /// show contents of an object
    CatFile {
        /// object type (blob, tree, commit)
        object_type: String,

        /// object id, abbreviated id or ref
        object: String,
    },

    /// stage files or directories
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// record the staged index as a new commit
    Commit {
        /// commit message
        #[arg(short, long)]
        message: String,

        /// author as "Name <email>"
        #[arg(long)]
        author: Option<String>,
    },

    /// show commit history
    Log {
        /// revision to start from
        #[arg(default_value = HEAD)]
        rev: String,

        /// maximum number of commits to show
        #[arg(short = 'n', long)]
        max_count: Option<usize>,

        /// follow only first parents
        #[arg(long)]
        first_parent: bool,
    },

    /// list tree contents
    LsTree {
        /// commit or tree to list
        rev: String,

        /// list recursively
        #[arg(short, long)]
        recursive: bool,
    },

    /// list, create or delete branches
    Branch {
        /// branch to create
        name: Option<String>,

        /// revision the new branch starts at
        start: Option<String>,

        /// delete the named branch
        #[arg(short, long, conflicts_with_all = ["name", "start", "list"])]
        delete: Option<String>,

        /// only list branches matching a glob
        #[arg(long, conflicts_with_all = ["name", "start"])]
        list: Option<String>,
    },

    /// attach HEAD to a branch
    Checkout {
        branch: String,
    },

    /// list or create lightweight tags
    Tag {
        /// tag to create
        name: Option<String>,

        /// revision to tag
        #[arg(default_value = HEAD)]
        rev: String,
    },

    /// resolve a revision to an object id
    RevParse {
        /// ref, id or abbreviated id
        rev: String,

        /// output short id (first 12 chars)
        #[arg(long)]
        short: bool,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: Cli) -> wyrm::Result<()> {
    match cli.command {
        Commands::Init { path } => {
            let repo = Repo::init(&in_dir(&cli.repo, path))?;
            println!("initialized wyrm repository in {}", repo.path().display());
        }

        Commands::HashObject {
            write,
            object_type,
            path,
        } => {
            let kind: ObjectKind = object_type.parse()?;
            let path = in_dir(&cli.repo, path);
            let content = std::fs::read(&path).map_err(|e| wyrm::Error::Io {
                path: path.clone(),
                source: e,
            })?;

            let id = if write {
                let repo = Repo::discover(&cli.repo)?;
                hash_object(Some(&repo), kind, &content)?
            } else {
                hash_object(None, kind, &content)?
            };
            println!("{}", id);
        }

        Commands::CatFile {
            object_type,
            object,
        } => {
            let repo = Repo::discover(&cli.repo)?;
            let kind: ObjectKind = object_type.parse()?;

            match cat_file(&repo, kind, &object)? {
                Object::Tree(tree) => {
                    for entry in tree.entries() {
                        println!(
                            "{} {} {}\t{}",
                            entry.mode.as_str(),
                            entry.mode.object_type(),
                            entry.id,
                            entry.name
                        );
                    }
                }
                other => write_stdout(&other.encode())?,
            }
        }

        Commands::Add { paths } => {
            let repo = Repo::discover(&cli.repo)?;
            let paths: Vec<PathBuf> = paths.into_iter().map(|p| in_dir(&cli.repo, p)).collect();
            for entry in add(&repo, &paths)? {
                println!("add {}", entry.path);
            }
        }

        Commands::Commit { message, author } => {
            let repo = Repo::discover(&cli.repo)?;
            let id = commit(&repo, &message, author.as_deref())?;
            let summary = read_commit(repo.store(), &id)?.summary().to_string();
            let branch = current_branch(&repo)?.unwrap_or_else(|| "detached HEAD".to_string());
            println!("[{} {}] {}", branch, id.short(), summary);
        }

        Commands::Log {
            rev,
            max_count,
            first_parent,
        } => {
            let repo = Repo::discover(&cli.repo)?;
            for entry in log(&repo, &rev, max_count, first_parent)? {
                println!("{}", entry);
            }
        }

        Commands::LsTree { rev, recursive } => {
            let repo = Repo::discover(&cli.repo)?;
            for entry in ls_tree(&repo, &rev, recursive)? {
                println!("{}", entry);
            }
        }

        Commands::Branch {
            name,
            start,
            delete,
            list,
        } => {
            let repo = Repo::discover(&cli.repo)?;

            if let Some(branch) = delete {
                delete_branch(&repo, &branch)?;
                println!("deleted branch {}", branch);
            } else if let Some(branch) = name {
                let start = resolve_revision(&repo, start.as_deref().unwrap_or(HEAD))?;
                create_branch(&repo, &branch, &start)?;
            } else {
                let current = current_branch(&repo)?;
                let branches = match list {
                    Some(pattern) => list_branches_matching(&repo, &pattern)?,
                    None => list_branches(&repo)?,
                };
                for branch in branches {
                    let marker = if current.as_deref() == Some(branch.as_str()) {
                        '*'
                    } else {
                        ' '
                    };
                    println!("{} {}", marker, branch);
                }
            }
        }

        Commands::Checkout { branch } => {
            let repo = Repo::discover(&cli.repo)?;
            checkout(&repo, &branch)?;
            println!("switched to branch {}", branch);
        }

        Commands::Tag { name, rev } => {
            let repo = Repo::discover(&cli.repo)?;
            match name {
                Some(tag) => {
                    let id = resolve_revision(&repo, &rev)?;
                    create_tag(&repo, &tag, &id)?;
                }
                None => {
                    for tag in list_tags(&repo)? {
                        println!("{}", tag);
                    }
                }
            }
        }

        Commands::RevParse { rev, short } => {
            let repo = Repo::discover(&cli.repo)?;
            let id = resolve_revision(&repo, &rev)?;
            if short {
                println!("{}", id.short());
            } else {
                println!("{}", id);
            }
        }
    }

    Ok(())
}

/// resolve a path argument against the `-C` directory
fn in_dir(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn write_stdout(data: &[u8]) -> wyrm::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(data)
        .and_then(|_| stdout.flush())
        .map_err(|e| wyrm::Error::Io {
            path: "stdout".into(),
            source: e,
        })
}
