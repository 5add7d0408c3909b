use bson::{Bson, Document};
use crate::errors::{StoreError, StoreResult};

/// Field selection applied to query results (`keys` on find requests).
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Projection {
    Include { fields: Vec<String>, keep_id: bool },
    Exclude { fields: Vec<String> },
}

fn is_truthy(value: &Bson) -> StoreResult<bool> {
    match value {
        Bson::Boolean(b) => Ok(*b),
        Bson::Int32(i) => Ok(*i != 0),
        Bson::Int64(i) => Ok(*i != 0),
        Bson::Double(d) => Ok(*d != 0.0),
        other => Err(StoreError::rejected(format!("unsupported projection value: {}", other))),
    }
}

impl Projection {

    pub(crate) fn parse(keys: &Document) -> StoreResult<Option<Projection>> {
        if keys.is_empty() {
            return Ok(None);
        }
        let mut keep_id = true;
        let mut included = Vec::new();
        let mut excluded = Vec::new();
        for (key, value) in keys {
            let truthy = is_truthy(value)?;
            if key == "_id" {
                keep_id = truthy;
                continue;
            }
            if truthy {
                included.push(key.clone());
            } else {
                excluded.push(key.clone());
            }
        }

        if !included.is_empty() && !excluded.is_empty() {
            return Err(StoreError::rejected("projection cannot mix inclusion and exclusion"));
        }

        if !excluded.is_empty() || (included.is_empty() && !keep_id) {
            if !keep_id {
                excluded.push("_id".to_string());
            }
            return Ok(Some(Projection::Exclude { fields: excluded }));
        }

        Ok(Some(Projection::Include { fields: included, keep_id }))
    }

    pub(crate) fn apply(&self, doc: Document) -> Document {
        match self {
            Projection::Include { fields, keep_id } => {
                let mut result = Document::new();
                if *keep_id {
                    if let Some(id) = doc.get("_id") {
                        result.insert("_id", id.clone());
                    }
                }
                for field in fields {
                    let parts: Vec<&str> = field.split('.').collect();
                    copy_path(&doc, &mut result, &parts);
                }
                result
            },
            Projection::Exclude { fields } => {
                let mut result = doc;
                for field in fields {
                    let parts: Vec<&str> = field.split('.').collect();
                    remove_path(&mut result, &parts);
                }
                result
            },
        }
    }

}

fn copy_path(src: &Document, dst: &mut Document, parts: &[&str]) {
    let (head, rest) = match parts.split_first() {
        Some(split) => split,
        None => return,
    };
    let value = match src.get(*head) {
        Some(v) => v,
        None => return,
    };
    if rest.is_empty() {
        dst.insert(*head, value.clone());
        return;
    }
    if let Bson::Document(sub_src) = value {
        if !matches!(dst.get(*head), Some(Bson::Document(_))) {
            dst.insert(*head, Document::new());
        }
        if let Some(Bson::Document(sub_dst)) = dst.get_mut(*head) {
            copy_path(sub_src, sub_dst, rest);
        }
    }
}

fn remove_path(doc: &mut Document, parts: &[&str]) {
    match parts {
        [] => (),
        [last] => {
            doc.remove(*last);
        },
        [head, rest @ ..] => {
            if let Some(Bson::Document(sub)) = doc.get_mut(*head) {
                remove_path(sub, rest);
            }
        },
    }
}
