use std::collections::HashSet;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};
use console::style;

use crate::api::models::{Build, BuildStep, ProjectSummary};

fn base_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn status_cell(status: &str) -> Cell {
    let color = match status {
        "success" | "fixed" => TableColor::Green,
        "failed" | "timedout" | "infrastructure_fail" => TableColor::Red,
        "running" => TableColor::Yellow,
        _ => TableColor::Grey,
    };
    Cell::new(status).fg(color)
}

pub fn print_projects(projects: &[ProjectSummary]) {
    let mut table = base_table(&["Project", "VCS", "URL"]);
    for project in projects {
        table.add_row(vec![
            Cell::new(&project.id),
            Cell::new(&project.vcs_type),
            Cell::new(&project.url),
        ]);
    }
    println!("{table}");
}

pub fn print_organizations(organizations: &HashSet<String>) {
    let mut names: Vec<&String> = organizations.iter().collect();
    names.sort();
    for name in names {
        println!("{name}");
    }
}

pub fn print_builds(builds: &[Build]) {
    let mut table = base_table(&["#", "Job", "Workflow", "Branch", "Status", "URL"]);
    for build in builds {
        table.add_row(vec![
            Cell::new(build.build_num),
            Cell::new(build.job_name()),
            Cell::new(build.workflow_name()),
            Cell::new(&build.branch),
            status_cell(&build.status.to_string()),
            Cell::new(&build.build_url),
        ]);
    }
    println!("{table}");
}

pub fn print_build(build: &Build) {
    println!(
        "{} {}",
        style(format!("Build {}", build.build_num)).bold(),
        style(&build.build_url).dim()
    );
    println!("  job:      {}", build.job_name());
    println!(
        "  workflow: {} {}",
        build.workflow_name(),
        style(build.workflow_id()).dim()
    );
    println!("  branch:   {}", build.branch);
    println!("  status:   {}", build.status);
    println!("  outcome:  {}", build.outcome);
}

pub fn print_steps(steps: &[BuildStep]) {
    let mut table = base_table(&["Step", "Index", "Name", "Status"]);
    for step in steps {
        table.add_row(vec![
            Cell::new(step.step_id),
            Cell::new(step.index),
            Cell::new(&step.name),
            status_cell(&step.status),
        ]);
    }
    println!("{table}");
}
