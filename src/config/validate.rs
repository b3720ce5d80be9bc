// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile, StageConfig, TaskKind};
use crate::errors::{AssetdagError, Result};
use crate::fileset::FilePattern;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::AssetdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_names(cfg)?;
    validate_references(cfg)?;
    validate_tasks(cfg)?;
    validate_graph(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(AssetdagError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.queue_length == 0 {
        return Err(AssetdagError::ConfigError(
            "[watch].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.paths.output.trim().is_empty() {
        return Err(AssetdagError::ConfigError(
            "[paths].output must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.pipeline.keys() {
        if cfg.task.contains_key(name) {
            return Err(AssetdagError::ConfigError(format!(
                "'{}' is defined both as a task and as a pipeline",
                name
            )));
        }
    }
    Ok(())
}

fn is_known(cfg: &RawConfigFile, name: &str) -> bool {
    cfg.task.contains_key(name) || cfg.pipeline.contains_key(name)
}

fn validate_references(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if dep == name {
                return Err(AssetdagError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !is_known(cfg, dep) {
                return Err(AssetdagError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }

    for (name, plan) in cfg.pipeline.iter() {
        for member in plan.referenced_names() {
            if !is_known(cfg, member) {
                return Err(AssetdagError::ConfigError(format!(
                    "pipeline '{}' references unknown task '{}'",
                    name, member
                )));
            }
        }
    }

    for (idx, binding) in cfg.watch.binding.iter().enumerate() {
        if binding.patterns.is_empty() {
            return Err(AssetdagError::ConfigError(format!(
                "watch binding #{} has no patterns",
                idx
            )));
        }
        if binding.run.is_empty() {
            return Err(AssetdagError::ConfigError(format!(
                "watch binding #{} has an empty `run` list",
                idx
            )));
        }
        for member in binding.run.iter() {
            if !is_known(cfg, member) {
                return Err(AssetdagError::ConfigError(format!(
                    "watch binding #{} references unknown task '{}'",
                    idx, member
                )));
            }
        }
        FilePattern::new(&binding.patterns)?;
    }

    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.kind != TaskKind::Process {
            continue;
        }

        if task.dest.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(AssetdagError::ConfigError(format!(
                "task '{}' needs a `dest` directory",
                name
            )));
        }

        FilePattern::new(&task.src)?;

        for stage in task.stages.iter() {
            match stage {
                StageConfig::Rename { to } if to.trim().is_empty() || to.contains('/') => {
                    return Err(AssetdagError::ConfigError(format!(
                        "task '{}': rename target must be a plain file name (got '{}')",
                        name, to
                    )));
                }
                StageConfig::Optimize { quality: Some(q) } if *q == 0 || *q > 100 => {
                    return Err(AssetdagError::ConfigError(format!(
                        "task '{}': optimize quality must be within 1..=100 (got {})",
                        name, q
                    )));
                }
                StageConfig::Command { cmd } if cmd.trim().is_empty() => {
                    return Err(AssetdagError::ConfigError(format!(
                        "task '{}': command stage has an empty `cmd`",
                        name
                    )));
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn validate_graph(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: prerequisite -> dependent.
    //
    //   [task.B] after = ["A"]        adds A -> B
    //   [pipeline] P = ["A", "B"]     adds A -> P, B -> P
    //
    // A pipeline that (transitively) contains itself, or a task whose
    // `after` chain loops back, shows up as a cycle.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys().chain(cfg.pipeline.keys()) {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    for (name, plan) in cfg.pipeline.iter() {
        for member in plan.referenced_names() {
            graph.add_edge(member, name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(AssetdagError::DagCycle(format!(
                "cycle detected in task graph involving '{}'",
                node
            )))
        }
    }
}
