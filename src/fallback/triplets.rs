//! Graph triplet retrieval

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ArcadeResult;
use crate::query::literal::quote;
use crate::query::{into_rows, Dispatcher};
use crate::transaction::Session;

use super::chain::FallbackChain;

/// One subject-relation-object edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triplet {
    #[serde(default)]
    pub subject: Value,
    #[serde(default)]
    pub relation: Value,
    #[serde(default)]
    pub object: Value,
}

/// Optional type filters; an empty list matches everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripletFilter {
    pub subject_types: Vec<String>,
    pub relation_types: Vec<String>,
    pub object_types: Vec<String>,
    pub limit: Option<usize>,
}

impl TripletFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subjects<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subject_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn relations<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relation_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn objects<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.object_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Cap the number of triplets; 0 means no cap
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit).filter(|n| *n > 0);
        self
    }

    fn limit_clause(&self) -> String {
        self.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default()
    }

    /// Endpoint types are checked here rather than by the server
    fn filters_endpoints(&self) -> bool {
        !self.subject_types.is_empty() || !self.object_types.is_empty()
    }
}

/// Reads triplets with three strategies of decreasing fidelity:
///
/// 1. a MATCH pattern with the filters pushed to the server
/// 2. an edge scan projecting both endpoint vertices, filtered here
/// 3. a raw edge listing with endpoints known only by record id
#[derive(Debug, Clone, Copy)]
pub struct TripletFetcher<'a> {
    dispatcher: Dispatcher<'a>,
}

impl<'a> TripletFetcher<'a> {
    pub fn new(dispatcher: Dispatcher<'a>) -> Self {
        Self { dispatcher }
    }

    pub fn fetch(
        &self,
        filter: &TripletFilter,
        session: Option<&Session>,
    ) -> ArcadeResult<Vec<Triplet>> {
        FallbackChain::new("triplets")
            .then("match", || self.by_match(filter, session))
            .then("edge-traversal", || self.by_traversal(filter, session))
            .then("edge-listing", || self.by_listing(filter, session))
            .run()
    }

    fn by_match(&self, filter: &TripletFilter, session: Option<&Session>) -> ArcadeResult<Vec<Triplet>> {
        let rows = self
            .dispatcher
            .sql(&match_query(filter), session)
            .map(into_rows)?;
        Ok(rows
            .into_iter()
            .filter(Value::is_object)
            .map(|row| Triplet {
                subject: row.get("subject").cloned().unwrap_or_default(),
                relation: row.get("relation").cloned().unwrap_or_default(),
                object: row.get("object").cloned().unwrap_or_default(),
            })
            .collect())
    }

    /// With endpoint type filters the limit applies to the filtered edges,
    /// not to the server's scan.
    fn by_traversal(&self, filter: &TripletFilter, session: Option<&Session>) -> ArcadeResult<Vec<Triplet>> {
        let server_limit = if filter.filters_endpoints() {
            String::new()
        } else {
            filter.limit_clause()
        };
        let query = format!(
            "SELECT *, outV() as subject, inV() as object FROM E{}{}",
            edge_where(&filter.relation_types),
            server_limit
        );
        let rows = self.dispatcher.sql(&query, session).map(into_rows)?;

        let mut triplets = Vec::new();
        for row in rows {
            let Value::Object(mut edge) = row else {
                continue;
            };
            let subject = single(edge.remove("subject").unwrap_or_default());
            let object = single(edge.remove("object").unwrap_or_default());
            if !matches_types(&subject, &filter.subject_types)
                || !matches_types(&object, &filter.object_types)
            {
                continue;
            }
            triplets.push(Triplet {
                subject,
                relation: Value::Object(edge),
                object,
            });
            if filter.limit == Some(triplets.len()) {
                break;
            }
        }
        Ok(triplets)
    }

    fn by_listing(&self, filter: &TripletFilter, session: Option<&Session>) -> ArcadeResult<Vec<Triplet>> {
        let query = format!(
            "SELECT * FROM E{}{}",
            edge_where(&filter.relation_types),
            filter.limit_clause()
        );
        let rows = self.dispatcher.sql(&query, session).map(into_rows)?;

        Ok(rows
            .into_iter()
            .filter(Value::is_object)
            .map(|edge| Triplet {
                subject: rid_only(&edge, "@out", "out"),
                object: rid_only(&edge, "@in", "in"),
                relation: edge,
            })
            .collect())
    }
}

fn class_filter(alias: Option<&str>, types: &[String]) -> Option<String> {
    if types.is_empty() {
        return None;
    }
    let field = match alias {
        Some(alias) => format!("{}.@type", alias),
        None => "@type".to_string(),
    };
    let parts: Vec<String> = types
        .iter()
        .map(|t| format!("{} = {}", field, quote(t)))
        .collect();
    Some(format!("({})", parts.join(" OR ")))
}

fn match_query(filter: &TripletFilter) -> String {
    let mut query = String::from(
        "MATCH {type: V, as: subject}.outE(){as: relation}.inV(){as: object}",
    );
    let conditions: Vec<String> = [
        class_filter(Some("subject"), &filter.subject_types),
        class_filter(Some("relation"), &filter.relation_types),
        class_filter(Some("object"), &filter.object_types),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !conditions.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&conditions.join(" AND "));
    }
    query.push_str(" RETURN subject, relation, object");
    query.push_str(&filter.limit_clause());
    query
}

fn edge_where(relation_types: &[String]) -> String {
    class_filter(None, relation_types)
        .map(|condition| format!(" WHERE {}", condition))
        .unwrap_or_default()
}

/// Projections of a single vertex may come back wrapped in a list
fn single(value: Value) -> Value {
    match value {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        Value::Array(_) => Value::Null,
        other => other,
    }
}

fn type_of(vertex: &Value) -> Option<&str> {
    vertex
        .get("@type")
        .or_else(|| vertex.get("@class"))
        .and_then(Value::as_str)
}

fn matches_types(vertex: &Value, types: &[String]) -> bool {
    types.is_empty() || type_of(vertex).map_or(false, |t| types.iter().any(|x| x == t))
}

fn rid_only(edge: &Value, primary: &str, secondary: &str) -> Value {
    let rid = edge
        .get(primary)
        .or_else(|| edge.get(secondary))
        .cloned()
        .unwrap_or_default();
    let mut endpoint = Map::new();
    endpoint.insert("@rid".to_string(), rid);
    Value::Object(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;
    use crate::error::ErrorKind;
    use crate::transport::ScriptedTransport;
    use serde_json::json;

    fn parsing_error() -> Value {
        json!({
            "error": "Syntax error",
            "exception": "com.arcadedb.exception.CommandSQLParsingException"
        })
    }

    #[test]
    fn test_match_query_shape() {
        let filter = TripletFilter::new()
            .subjects(["Person"])
            .relations(["Knows", "Likes"])
            .limit(5);
        assert_eq!(
            match_query(&filter),
            "MATCH {type: V, as: subject}.outE(){as: relation}.inV(){as: object} \
             WHERE (subject.@type = 'Person') AND (relation.@type = 'Knows' OR relation.@type = 'Likes') \
             RETURN subject, relation, object LIMIT 5"
        );
    }

    #[test]
    fn test_traversal_filters_client_side() {
        let transport = ScriptedTransport::new();
        transport.push_server_error(parsing_error());
        transport.push_ok(json!([
            {"@rid": "#9:0", "@type": "Knows",
             "subject": [{"@rid": "#1:0", "@type": "Person"}],
             "object": {"@rid": "#2:0", "@type": "Company"}},
            {"@rid": "#9:1", "@type": "Knows",
             "subject": {"@rid": "#1:1", "@type": "Person"},
             "object": {"@rid": "#1:2", "@type": "Person"}}
        ]));
        let endpoints = Endpoints::default();
        let fetcher = TripletFetcher::new(Dispatcher::new(&transport, "db", &endpoints));

        let filter = TripletFilter::new().objects(["Company"]);
        let triplets = fetcher.fetch(&filter, None).unwrap();

        assert_eq!(triplets.len(), 1);
        assert_eq!(triplets[0].subject["@rid"], "#1:0");
        assert_eq!(triplets[0].object["@type"], "Company");
        assert_eq!(triplets[0].relation, json!({"@rid": "#9:0", "@type": "Knows"}));
        assert_eq!(
            transport.commands()[1],
            "SELECT *, outV() as subject, inV() as object FROM E"
        );
    }

    #[test]
    fn test_traversal_limits_after_filtering() {
        let transport = ScriptedTransport::new();
        transport.push_server_error(parsing_error());
        transport.push_ok(json!([
            {"@rid": "#9:0", "subject": {"@type": "Person"}, "object": {"@type": "Person"}},
            {"@rid": "#9:1", "subject": {"@type": "Person"}, "object": {"@type": "Company"}},
            {"@rid": "#9:2", "subject": {"@type": "Person"}, "object": {"@type": "Person"}},
            {"@rid": "#9:3", "subject": {"@type": "Person"}, "object": {"@type": "Company"}},
            {"@rid": "#9:4", "subject": {"@type": "Person"}, "object": {"@type": "Company"}}
        ]));
        let endpoints = Endpoints::default();
        let fetcher = TripletFetcher::new(Dispatcher::new(&transport, "db", &endpoints));

        let filter = TripletFilter::new().objects(["Company"]).limit(2);
        let triplets = fetcher.fetch(&filter, None).unwrap();

        let rids: Vec<_> = triplets.iter().map(|t| t.relation["@rid"].clone()).collect();
        assert_eq!(rids, vec![json!("#9:1"), json!("#9:3")]);
        assert_eq!(
            transport.commands()[1],
            "SELECT *, outV() as subject, inV() as object FROM E"
        );

        transport.push_server_error(parsing_error());
        transport.push_ok(json!([]));
        let relations_only = TripletFilter::new().relations(["Knows"]).limit(2);
        fetcher.fetch(&relations_only, None).unwrap();
        assert_eq!(
            transport.commands()[3],
            "SELECT *, outV() as subject, inV() as object FROM E WHERE (@type = 'Knows') LIMIT 2"
        );
    }

    #[test]
    fn test_listing_is_last_resort() {
        let transport = ScriptedTransport::new();
        transport.push_server_error(parsing_error());
        transport.push_server_error(parsing_error());
        transport.push_ok(json!([{"@rid": "#9:0", "@out": "#1:0", "@in": "#2:0"}]));
        let endpoints = Endpoints::default();
        let fetcher = TripletFetcher::new(Dispatcher::new(&transport, "db", &endpoints));

        let filter = TripletFilter::new().relations(["Knows"]);
        let triplets = fetcher.fetch(&filter, None).unwrap();

        assert_eq!(triplets.len(), 1);
        assert_eq!(triplets[0].subject, json!({"@rid": "#1:0"}));
        assert_eq!(triplets[0].object, json!({"@rid": "#2:0"}));
        assert_eq!(
            transport.commands()[2],
            "SELECT * FROM E WHERE (@type = 'Knows')"
        );
    }

    #[test]
    fn test_non_parsing_error_is_not_masked() {
        let transport = ScriptedTransport::new();
        transport.push_server_error(json!({
            "error": "Invalid credentials",
            "exception": "com.arcadedb.server.security.ServerSecurityException"
        }));
        let endpoints = Endpoints::default();
        let fetcher = TripletFetcher::new(Dispatcher::new(&transport, "db", &endpoints));

        let err = fetcher.fetch(&TripletFilter::new(), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(transport.call_count(), 1);
    }
}
