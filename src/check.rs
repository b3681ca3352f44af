use anyhow::{Context, Result};
use log::info;

use crate::{cli::CheckArgs, config::PipelineConfig, pipeline::Pipeline, table};

pub fn execute(args: &CheckArgs) -> Result<()> {
    let config = PipelineConfig::load(&args.config)
        .with_context(|| format!("Loading pipeline config {:?}", args.config))?;
    let pipeline = Pipeline::new(config)?;
    let config = pipeline.config();

    if !config.lookups.is_empty() {
        let headers = ["target", "match", "reference", "key", "value"].map(String::from);
        let rows = config
            .lookups
            .iter()
            .map(|spec| {
                vec![
                    spec.target_column.clone(),
                    spec.match_column.clone(),
                    spec.reference.clone(),
                    spec.key_column.clone(),
                    spec.value_column.clone(),
                ]
            })
            .collect::<Vec<_>>();
        print!("{}", table::render_table(&headers, &rows));
    }

    if let Some(rules) = pipeline.rules() {
        let headers = ["#", "rule", "when", "then", "otherwise"].map(String::from);
        let mut rows = Vec::new();
        for rule in rules.keyword_rules() {
            rows.push(vec![
                (rows.len() + 1).to_string(),
                "keyword".to_string(),
                format!("{} contains '{}'", rule.column, rule.keyword),
                rule.value.clone(),
                String::new(),
            ]);
        }
        for rule in rules.threshold_rules() {
            let when = if rule.always_above {
                format!("{} = {} (always)", rules.category_column(), rule.category)
            } else {
                format!(
                    "{} = {} and {} > {}",
                    rules.category_column(),
                    rule.category,
                    rule.column,
                    rule.threshold
                )
            };
            rows.push(vec![
                (rows.len() + 1).to_string(),
                "threshold".to_string(),
                when,
                rule.above.clone(),
                rule.at_or_below.clone(),
            ]);
        }
        print!("{}", table::render_table(&headers, &rows));
    }

    info!(
        "Config {:?} is valid: {} lookup(s), {} classification rule(s)",
        args.config,
        config.lookups.len(),
        config
            .classification
            .as_ref()
            .map(|c| c.rules.len())
            .unwrap_or(0)
    );
    Ok(())
}
