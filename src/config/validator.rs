//! Schema validation: referential integrity of the relation graph.

use crate::config::{EntityConfig, SchemaConfig};
use crate::error::ConfigError;
use crate::config::resolved::CUSTOM_FIELDS;
use regex::Regex;
use std::collections::{HashMap, HashSet};

const IDENTIFIER: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

pub fn validate(config: &SchemaConfig) -> Result<(), ConfigError> {
    if config.entities.is_empty() {
        return Err(ConfigError::Validation("at least one entity required".into()));
    }
    let ident = Regex::new(IDENTIFIER).map_err(|e| ConfigError::Validation(e.to_string()))?;
    let check_ident = |name: &str| {
        if ident.is_match(name) {
            Ok(())
        } else {
            Err(ConfigError::InvalidIdentifier(name.to_string()))
        }
    };

    let mut by_name: HashMap<&str, &EntityConfig> = HashMap::new();
    for e in &config.entities {
        check_ident(&e.name)?;
        if by_name.insert(e.name.as_str(), e).is_some() {
            return Err(ConfigError::DuplicateEntity(e.name.clone()));
        }
    }

    for e in &config.entities {
        let mut properties = HashSet::new();
        for r in &e.relations {
            check_ident(&r.name)?;
            if r.name == CUSTOM_FIELDS {
                return Err(ConfigError::Validation(format!(
                    "{}: '{}' is reserved",
                    e.name, CUSTOM_FIELDS
                )));
            }
            if !properties.insert(r.name.as_str()) {
                return Err(ConfigError::DuplicateRelation {
                    entity: e.name.clone(),
                    property: r.name.clone(),
                });
            }
            if !by_name.contains_key(r.target.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "relation target",
                    id: format!("{}.{} -> {}", e.name, r.name, r.target),
                });
            }
        }

        let mut custom = HashSet::new();
        for cf in &e.custom_fields {
            check_ident(&cf.name)?;
            if !custom.insert(cf.name.as_str()) {
                return Err(ConfigError::DuplicateRelation {
                    entity: e.name.clone(),
                    property: format!("{}.{}", CUSTOM_FIELDS, cf.name),
                });
            }
            if let Some(rel) = &cf.relation {
                if !by_name.contains_key(rel.target.as_str()) {
                    return Err(ConfigError::MissingReference {
                        kind: "custom field target",
                        id: format!("{}.{}.{} -> {}", e.name, CUSTOM_FIELDS, cf.name, rel.target),
                    });
                }
            }
        }

        for calc in &e.calculated {
            check_ident(&calc.name)?;
        }

        if let Some(t) = &e.translation {
            match e.relations.iter().find(|r| r.name == t.relation) {
                Some(r) if r.many => {}
                _ => {
                    return Err(ConfigError::Validation(format!(
                        "{}: translation relation '{}' must be a declared to-many relation",
                        e.name, t.relation
                    )))
                }
            }
            for f in &t.fields {
                check_ident(f)?;
            }
        }
    }

    Ok(())
}
