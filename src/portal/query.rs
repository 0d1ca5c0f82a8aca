use crate::data::loader::Separator;

/// The current browsing position, mirrored as a bookmarkable query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub domain: Option<String>,
    pub project: Option<String>,
    pub dataset: Option<String>,
    pub file: Option<String>,
    /// `None` means the configured default separator.
    pub sep: Option<Separator>,
}

impl Selection {
    /// Parse `domain=..&project=..` (a leading `?` is allowed).
    ///
    /// Unknown keys, empty values and unknown separators are ignored.
    pub fn from_query(query: &str) -> Self {
        let mut selection = Selection::default();
        let query = query.trim().trim_start_matches('?');
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode(value);
            if value.is_empty() {
                continue;
            }
            match key {
                "domain" => selection.domain = Some(value),
                "project" => selection.project = Some(value),
                "dataset" => selection.dataset = Some(value),
                "file" => selection.file = Some(value),
                "sep" => selection.sep = Separator::from_name(&value),
                other => log::debug!("ignoring query parameter '{other}'"),
            }
        }
        selection
    }

    /// Present keys in `domain, project, dataset, file, sep` order.
    pub fn to_query(&self) -> String {
        let sep = self.sep.map(|s| s.name().to_string());
        [
            ("domain", &self.domain),
            ("project", &self.project),
            ("dataset", &self.dataset),
            ("file", &self.file),
            ("sep", &sep),
        ]
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|v| format!("{key}={}", urlencoding::encode(v)))
        })
        .collect::<Vec<_>>()
        .join("&")
    }

    pub fn set_domain(&mut self, domain: Option<String>) {
        if self.domain != domain {
            self.domain = domain;
            self.set_project(None);
        }
    }

    pub fn set_project(&mut self, project: Option<String>) {
        if self.project != project {
            self.project = project;
            self.set_dataset(None);
        }
    }

    pub fn set_dataset(&mut self, dataset: Option<String>) {
        if self.dataset != dataset {
            self.dataset = dataset;
            self.file = None;
        }
    }
}

fn decode(value: &str) -> String {
    let value = value.replace('+', " ");
    urlencoding::decode(&value)
        .map(|v| v.into_owned())
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let s = Selection::from_query("?domain=lab&project=p1&dataset=ds%201&file=a%2Fb.csv&sep=tab&x=1");
        assert_eq!(s.domain.as_deref(), Some("lab"));
        assert_eq!(s.project.as_deref(), Some("p1"));
        assert_eq!(s.dataset.as_deref(), Some("ds 1"));
        assert_eq!(s.file.as_deref(), Some("a/b.csv"));
        assert_eq!(s.sep, Some(Separator::Tab));
    }

    #[test]
    fn test_bad_values_are_ignored() {
        let s = Selection::from_query("project=&sep=pipe&&dataset");
        assert_eq!(s, Selection::default());
    }

    #[test]
    fn test_query_round_trip_keeps_order() {
        let s = Selection {
            domain: Some("lab".into()),
            project: None,
            dataset: Some("my data".into()),
            file: Some("dir/x.tsv".into()),
            sep: Some(Separator::Space),
        };
        let q = s.to_query();
        assert_eq!(q, "domain=lab&dataset=my%20data&file=dir%2Fx.tsv&sep=space");
        assert_eq!(Selection::from_query(&q), s);
    }

    #[test]
    fn test_parent_change_clears_children() {
        let mut s = Selection::from_query("domain=a&project=p&dataset=d&file=f");
        s.set_dataset(Some("d".into()));
        assert_eq!(s.file.as_deref(), Some("f"));
        s.set_project(Some("q".into()));
        assert_eq!(s.dataset, None);
        assert_eq!(s.file, None);
        s.set_domain(None);
        assert_eq!(s.project, None);
    }
}
