// src/tabs.rs

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TabError {
    #[error("no tabs to coordinate")]
    Empty,
    #[error("unknown tab {0:?}")]
    Unknown(String),
}

/// Tracks which of a fixed set of views is showing. Exactly one is active.
#[derive(Debug, Clone)]
pub struct TabCoordinator {
    tabs: Vec<String>,
    active: usize,
}

impl TabCoordinator {
    /// `initial` of `None` activates the first tab.
    pub fn new<I, S>(tabs: I, initial: Option<&str>) -> Result<Self, TabError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tabs: Vec<String> = tabs.into_iter().map(Into::into).collect();
        if tabs.is_empty() {
            return Err(TabError::Empty);
        }
        let mut coord = Self { tabs, active: 0 };
        if let Some(id) = initial {
            coord.select(id)?;
        }
        Ok(coord)
    }

    pub fn active(&self) -> &str {
        &self.tabs[self.active]
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active() == id
    }

    pub fn tabs(&self) -> &[String] {
        &self.tabs
    }

    /// Activate `id`, deactivating every other tab. Unknown ids change nothing.
    pub fn select(&mut self, id: &str) -> Result<(), TabError> {
        let idx = self
            .tabs
            .iter()
            .position(|t| t == id)
            .ok_or_else(|| TabError::Unknown(id.to_string()))?;
        if idx != self.active {
            debug!(from = %self.tabs[self.active], to = %id, "tab switch");
        }
        self.active = idx;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tab_active_by_default() {
        let tabs = TabCoordinator::new(["results", "theta", "powerflow"], None).unwrap();
        assert_eq!(tabs.active(), "results");
    }

    #[test]
    fn test_select_deactivates_others() {
        let mut tabs = TabCoordinator::new(["results", "theta", "powerflow"], None).unwrap();
        tabs.select("powerflow").unwrap();
        let active: Vec<&String> = tabs.tabs().iter().filter(|t| tabs.is_active(t)).collect();
        assert_eq!(active, vec!["powerflow"]);

        tabs.select("powerflow").unwrap();
        assert_eq!(tabs.active(), "powerflow");
    }

    #[test]
    fn test_unknown_tab_leaves_state() {
        let mut tabs = TabCoordinator::new(["a", "b"], Some("b")).unwrap();
        assert_eq!(tabs.select("zzz"), Err(TabError::Unknown("zzz".into())));
        assert_eq!(tabs.active(), "b");
    }

    #[test]
    fn test_empty_and_bad_initial() {
        assert_eq!(
            TabCoordinator::new(Vec::<String>::new(), None).unwrap_err(),
            TabError::Empty
        );
        assert!(TabCoordinator::new(["a"], Some("b")).is_err());
    }
}
