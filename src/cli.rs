use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use crate::api::models::Project;
use crate::api::{CircleClient, ListBuilds};
use crate::config::Config;
use crate::output;

#[derive(Parser)]
#[command(name = "circlog")]
#[command(author, version, about = "Browse CircleCI builds, workflows and step logs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file location (default: ~/.circleci/cli.yml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// CircleCI API token
    #[arg(short, long, global = true, env = "CIRCLECI_TOKEN")]
    token: Option<String>,

    /// CircleCI host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Project in the form <vcs>/<username>/<reponame>
    #[arg(short = 'P', long, global = true)]
    project: Option<String>,

    /// Always fetch live, skipping the response cache
    #[arg(long, global = true, default_value_t = false)]
    no_cache: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the projects you follow
    Projects,

    /// List the organizations across your projects
    Orgs,

    /// List one page of builds for a project
    Builds {
        #[arg(short, long, default_value_t = 30)]
        limit: u32,

        #[arg(short, long, default_value_t = 0)]
        offset: u32,

        /// Upstream status filter (e.g., "completed", "failed")
        #[arg(short, long)]
        filter: Option<String>,

        #[arg(short, long)]
        branch: Option<String>,
    },

    /// Show details of a single build
    Build { build_num: u64 },

    /// List the steps of a build
    Steps {
        build_num: u64,

        /// Only this step id
        #[arg(short, long)]
        step: Option<u64>,

        /// Parallel run index
        #[arg(short, long, default_value_t = 0)]
        index: u64,
    },

    /// Print the log output of one build step
    Logs {
        build_num: u64,
        step_id: u64,

        /// Parallel run index
        #[arg(short, long, default_value_t = 0)]
        index: u64,
    },

    /// Find step ids by name substring
    FindStep { build_num: u64, pattern: String },
}

impl Cli {
    pub fn execute(&self) -> Result<()> {
        let config = Config::load(
            self.config.as_deref(),
            self.token.clone(),
            self.host.clone(),
            self.project.clone(),
        )?;

        let project = config
            .project
            .as_deref()
            .map(str::parse::<Project>)
            .transpose()?;

        let client = CircleClient::new(&config.host, &config.token, project, self.no_cache)?;

        match &self.command {
            Commands::Projects => {
                let projects = client.projects()?;
                info!("Fetched {} projects", projects.len());
                output::print_projects(&projects);
            }
            Commands::Orgs => {
                output::print_organizations(&client.organizations()?);
            }
            Commands::Builds {
                limit,
                offset,
                filter,
                branch,
            } => {
                let opts = ListBuilds {
                    limit: *limit,
                    offset: *offset,
                    filter: filter.clone(),
                    branch: branch.clone(),
                };
                let builds = client
                    .builds(None, &opts)?
                    .collect::<crate::error::Result<Vec<_>>>()?;
                output::print_builds(&builds);
            }
            Commands::Build { build_num } => {
                output::print_build(&client.build_details(*build_num, None)?);
            }
            Commands::Steps {
                build_num,
                step,
                index,
            } => {
                let steps = client
                    .steps(*build_num, None, *step, *index)?
                    .collect::<crate::error::Result<Vec<_>>>()?;
                output::print_steps(&steps);
            }
            Commands::Logs {
                build_num,
                step_id,
                index,
            } => {
                print!("{}", client.logs(*build_num, *step_id, *index, None)?);
            }
            Commands::FindStep { build_num, pattern } => {
                for step_id in client.find_step_ids(*build_num, pattern, None)? {
                    println!("{}", step_id?);
                }
            }
        }

        Ok(())
    }
}
