// ── List filtering ──
//
// Pure narrowing of an already-fetched collection: free-text search over
// each item's designated fields, ANDed with exact-match facets. The source
// is only borrowed and its order is preserved.

use fleetwatch_api::{Action, Agent, Container, Domain, Image};

/// Discrete attributes a list can be narrowed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Facet {
    Status,
    /// Owning agent id.
    Agent,
    /// Action type.
    Type,
}

/// A facet selection: everything, or one specific value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    /// `"all"` and the empty string select everything.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Only(value.to_owned())
        }
    }
}

/// Something a [`ListFilter`] can narrow.
pub trait Filterable {
    /// Fields the free-text query is matched against.
    fn search_fields(&self) -> Vec<&str>;

    /// This item's value for `facet`, or `None` if it has none.
    fn facet_value(&self, facet: Facet) -> Option<String>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    query: String,
    facets: Vec<(Facet, Selection)>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl AsRef<str>) -> Self {
        self.query = query.as_ref().trim().to_lowercase();
        self
    }

    /// Set a facet selection, replacing any earlier one for the same facet.
    pub fn facet(mut self, facet: Facet, selection: Selection) -> Self {
        self.facets.retain(|(f, _)| *f != facet);
        self.facets.push((facet, selection));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.facets.iter().all(|(_, s)| *s == Selection::All)
    }

    pub fn matches<T: Filterable + ?Sized>(&self, item: &T) -> bool {
        let text_ok = self.query.is_empty()
            || item
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&self.query));

        text_ok
            && self.facets.iter().all(|(facet, selection)| match selection {
                Selection::All => true,
                Selection::Only(want) => item.facet_value(*facet).as_deref() == Some(want.as_str()),
            })
    }

    /// Items that pass, in source order.
    pub fn apply<'a, T: Filterable>(&self, items: &'a [T]) -> Vec<&'a T> {
        items.iter().filter(|item| self.matches(*item)).collect()
    }
}

// ── Filterable impls ─────────────────────────────────────────────────

impl Filterable for Agent {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.public_ip.as_deref());
        fields
    }

    fn facet_value(&self, facet: Facet) -> Option<String> {
        match facet {
            Facet::Status => Some(self.status.to_string()),
            Facet::Agent => Some(self.id.to_string()),
            Facet::Type => None,
        }
    }
}

impl Filterable for Container {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.container_id.as_str(), self.image_id.as_str()];
        fields.extend(self.agent_name.as_deref());
        fields
    }

    fn facet_value(&self, facet: Facet) -> Option<String> {
        match facet {
            Facet::Status => Some(self.status.clone()),
            Facet::Agent => self.agent_id.map(|id| id.to_string()),
            Facet::Type => None,
        }
    }
}

impl Filterable for Image {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        fields.push(self.image_id.as_str());
        fields.extend(self.agent_name.as_deref());
        fields
    }

    fn facet_value(&self, facet: Facet) -> Option<String> {
        match facet {
            Facet::Agent => self.agent_id.map(|id| id.to_string()),
            Facet::Status | Facet::Type => None,
        }
    }
}

impl Filterable for Action {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.action_type.as_str()];
        fields.extend(self.error.as_deref());
        fields.extend(self.response.as_deref());
        fields
    }

    fn facet_value(&self, facet: Facet) -> Option<String> {
        match facet {
            Facet::Status => Some(self.status.to_string()),
            Facet::Agent => Some(self.agent_id.to_string()),
            Facet::Type => Some(self.action_type.clone()),
        }
    }
}

impl Filterable for Domain {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.agent_ip.as_str()];
        fields.extend(self.agent_name.as_deref());
        fields
    }

    fn facet_value(&self, facet: Facet) -> Option<String> {
        match facet {
            Facet::Status => Some(if self.is_active { "active" } else { "inactive" }.to_owned()),
            Facet::Agent => Some(self.agent_id.to_string()),
            Facet::Type => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use fleetwatch_api::AgentStatus;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use super::*;

    fn container(name: &str, status: &str, agent: Uuid) -> Container {
        Container {
            id: Uuid::new_v4(),
            ping_id: None,
            container_id: format!("{name}-0001"),
            name: name.to_owned(),
            image_id: "sha256:abc".to_owned(),
            status: status.to_owned(),
            restart_count: 0,
            created_at: Utc::now(),
            ip_address: None,
            mac_address: None,
            cpu_usage_percent: None,
            memory_usage_mb: None,
            network_sent_bytes: None,
            network_received_bytes: None,
            agent_id: Some(agent),
            agent_name: Some("edge-1".to_owned()),
        }
    }

    fn names<'a>(items: &[&'a Container]) -> Vec<&'a str> {
        items.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn query_is_case_insensitive_substring() {
        let agent = Uuid::new_v4();
        let items = vec![
            container("Redis", "running", agent),
            container("nginx", "exited", agent),
            container("redis-replica", "running", agent),
        ];

        let hits = ListFilter::new().query("REDIS").apply(&items);
        assert_eq!(names(&hits), vec!["Redis", "redis-replica"]);
    }

    #[test]
    fn empty_filter_returns_everything_in_order() {
        let agent = Uuid::new_v4();
        let items = vec![
            container("b", "running", agent),
            container("a", "exited", agent),
        ];
        let filter = ListFilter::new().query("  ");
        assert!(filter.is_empty());
        assert_eq!(names(&filter.apply(&items)), vec!["b", "a"]);
    }

    #[test]
    fn facets_combine_with_and() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let items = vec![
            container("web", "running", a),
            container("db", "running", b),
            container("cache", "exited", a),
        ];

        let hits = ListFilter::new()
            .facet(Facet::Status, Selection::parse("running"))
            .facet(Facet::Agent, Selection::Only(a.to_string()))
            .apply(&items);
        assert_eq!(names(&hits), vec!["web"]);
    }

    #[test]
    fn all_selection_never_excludes() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let items = vec![
            container("web", "running", a),
            container("db", "paused", b),
        ];

        let only_status = ListFilter::new().facet(Facet::Status, Selection::parse("paused"));
        let with_all_agent = only_status.clone().facet(Facet::Agent, Selection::parse("all"));
        assert_eq!(only_status.apply(&items), with_all_agent.apply(&items));

        let everything = ListFilter::new()
            .facet(Facet::Status, Selection::All)
            .facet(Facet::Type, Selection::All);
        assert_eq!(everything.apply(&items).len(), items.len());
    }

    #[test]
    fn result_is_a_subsequence_of_the_source() {
        let agent = Uuid::new_v4();
        let items: Vec<_> = (0..20)
            .map(|i| container(&format!("svc-{i}"), if i % 3 == 0 { "exited" } else { "running" }, agent))
            .collect();

        let hits = ListFilter::new()
            .query("svc-1")
            .facet(Facet::Status, Selection::parse("running"))
            .apply(&items);

        let mut cursor = items.iter();
        for hit in &hits {
            assert!(cursor.any(|item| std::ptr::eq(item, *hit)), "out of order or foreign item");
        }
    }

    #[test]
    fn agent_status_facet_uses_wire_names() {
        let agent = Agent {
            id: Uuid::new_v4(),
            name: "edge-1".into(),
            token: None,
            is_active: true,
            created: Utc::now(),
            last_ping: None,
            public_ip: Some("198.51.100.4".into()),
            status: AgentStatus::Offline,
        };
        let filter = ListFilter::new().facet(Facet::Status, Selection::parse("offline"));
        assert!(filter.matches(&agent));
        assert!(ListFilter::new().query("198.51").matches(&agent));
    }
}
