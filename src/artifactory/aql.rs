use serde::Deserialize;
use serde_json::{json, Value};

use crate::artifactory::{ResultItem, SearchParams};

const INCLUDED_FIELDS: &str = r#""name","repo","path","actual_md5","actual_sha1","sha256","size","type","property""#;

#[derive(Deserialize, Debug, Default)]
pub struct AqlResponse {
    #[serde(default)]
    pub results: Vec<ResultItem>,
}

/// Translate a `repo/path/name` wildcard pattern into an AQL `items.find` query.
pub fn build_search_query(params: &SearchParams) -> String {
    let pattern = params.pattern.trim_start_matches('/');
    let (repo, rest) = pattern.split_once('/').unwrap_or((pattern, "*"));
    let (path, name) = rest.rsplit_once('/').unwrap_or((".", rest));
    let criteria = if params.recursive {
        json!({
            "repo": repo,
            "$or": [
                {"$and": [{"path": {"$match": path}, "name": {"$match": name}}]},
                {"$and": [{"path": {"$match": format!("{}/*", path)}, "name": {"$match": name}}]}
            ]
        })
    } else {
        json!({
            "repo": repo,
            "path": {"$match": path},
            "name": {"$match": name}
        })
    };
    items_find(&criteria)
}

fn items_find(criteria: &Value) -> String {
    format!("items.find({}).include({})", criteria, INCLUDED_FIELDS)
}
