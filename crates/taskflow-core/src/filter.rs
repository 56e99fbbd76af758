//! Board-view task filtering: free-text search plus profession match.

use crate::task::{Profession, Task};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub query: Option<String>,
    pub profession: Option<Profession>,
}

impl TaskFilter {
    pub fn new(query: Option<String>, profession: Option<Profession>) -> Self {
        let query = query
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        Self { query, profession }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.profession.is_none()
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(query) = &self.query {
            let in_title = task.title.to_lowercase().contains(query);
            let in_description = task
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(query))
                .unwrap_or(false);
            if !in_title && !in_description {
                return false;
            }
        }

        if let Some(profession) = self.profession {
            if task.profession != Some(profession) {
                return false;
            }
        }

        true
    }

    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::TaskFilter;
    use crate::task::{Priority, Profession, Task};

    fn task(title: &str, description: Option<&str>, profession: Option<Profession>) -> Task {
        let mut t = Task::new(
            title.to_string(),
            "b1".to_string(),
            "c1".to_string(),
            Priority::Medium,
            Utc::now(),
        );
        t.description = description.map(str::to_string);
        t.profession = profession;
        t
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = TaskFilter::new(None, None);
        assert!(filter.is_empty());
        assert!(filter.matches(&task("anything", None, None)));
    }

    #[test]
    fn query_matches_title_and_description_case_insensitively() {
        let filter = TaskFilter::new(Some("LOGIN".to_string()), None);
        assert!(filter.matches(&task("Fix login page", None, None)));
        assert!(filter.matches(&task("Bug", Some("broken login flow"), None)));
        assert!(!filter.matches(&task("Unrelated", Some("nothing here"), None)));
    }

    #[test]
    fn blank_query_is_dropped() {
        let filter = TaskFilter::new(Some("   ".to_string()), None);
        assert!(filter.is_empty());
    }

    #[test]
    fn profession_must_match_exactly() {
        let filter = TaskFilter::new(None, Some(Profession::Designer));
        assert!(filter.matches(&task("mockups", None, Some(Profession::Designer))));
        assert!(!filter.matches(&task("mockups", None, Some(Profession::Developer))));
        assert!(!filter.matches(&task("mockups", None, None)));
    }

    #[test]
    fn apply_keeps_only_matching_tasks() {
        let tasks = vec![
            task("Fix login", None, Some(Profession::Developer)),
            task("Design login", None, Some(Profession::Designer)),
        ];
        let filter = TaskFilter::new(Some("login".to_string()), Some(Profession::Developer));
        let matched = filter.apply(&tasks);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].title, "Fix login");
    }
}
