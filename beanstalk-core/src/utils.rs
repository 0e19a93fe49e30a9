//! Utility functions for the container
//!
//! Bean naming helpers and dependency bookkeeping shared by the registry and
//! the application context.

/// Naming convention utilities for bean names
pub mod naming {
    /// Converts a PascalCase type name to camelCase for bean naming.
    ///
    /// # Examples
    ///
    /// ```
    /// use beanstalk_core::utils::naming::to_camel_case;
    ///
    /// assert_eq!(to_camel_case("UserService"), "userService");
    /// assert_eq!(to_camel_case("A"), "a");
    /// assert_eq!(to_camel_case(""), "");
    /// ```
    pub fn to_camel_case(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => {
                let mut result = String::with_capacity(s.len());
                result.extend(first.to_lowercase());
                result.push_str(chars.as_str());
                result
            }
        }
    }

    /// Derives the default bean name for a type: the last path segment of its
    /// type name, generics stripped, in camelCase.
    ///
    /// # Examples
    ///
    /// ```
    /// use beanstalk_core::utils::naming::default_bean_name;
    ///
    /// struct ConnectionPool;
    /// assert_eq!(default_bean_name::<ConnectionPool>(), "connectionPool");
    /// assert_eq!(default_bean_name::<Vec<u8>>(), "vec");
    /// ```
    pub fn default_bean_name<T: ?Sized>() -> String {
        let full = std::any::type_name::<T>();
        let base = full.split('<').next().unwrap_or(full);
        let short = base.rsplit("::").next().unwrap_or(base);
        to_camel_case(short)
    }
}

/// Dependency resolution utilities
pub mod dependency {
    use parking_lot::RwLock;
    use std::collections::{HashMap, HashSet};
    use std::thread::{self, ThreadId};

    /// Tracks beans currently being created to detect circular dependencies.
    ///
    /// Creation chains are kept per thread: a bean being built on another
    /// thread is not a cycle, only a re-entry on the same thread is.
    #[derive(Debug, Default)]
    pub struct CreationTracker {
        creating: RwLock<HashMap<ThreadId, Vec<String>>>,
    }

    impl CreationTracker {
        /// Creates a new empty creation tracker.
        pub fn new() -> Self {
            Self::default()
        }

        /// Checks if a bean is currently being created on this thread.
        pub fn is_creating(&self, name: &str) -> bool {
            self.creating
                .read()
                .get(&thread::current().id())
                .is_some_and(|chain| chain.iter().any(|n| n == name))
        }

        /// Marks a bean as being created on this thread.
        ///
        /// Returns `false` if it was already in this thread's chain.
        pub fn start_creating(&self, name: &str) -> bool {
            let mut creating = self.creating.write();
            let chain = creating.entry(thread::current().id()).or_default();
            if chain.iter().any(|n| n == name) {
                return false;
            }
            chain.push(name.to_string());
            true
        }

        /// Marks a bean as finished being created on this thread.
        pub fn finish_creating(&self, name: &str) {
            let id = thread::current().id();
            let mut creating = self.creating.write();
            if let Some(chain) = creating.get_mut(&id) {
                if let Some(pos) = chain.iter().rposition(|n| n == name) {
                    chain.remove(pos);
                }
                if chain.is_empty() {
                    creating.remove(&id);
                }
            }
        }

        /// The creation chain of this thread, outermost bean first.
        pub fn current_creating(&self) -> Vec<String> {
            self.creating
                .read()
                .get(&thread::current().id())
                .cloned()
                .unwrap_or_default()
        }
    }

    /// Dependency graph analysis result
    #[derive(Debug)]
    pub enum DependencyValidationError {
        /// Circular dependency detected
        CircularDependency {
            /// The dependency chain forming the cycle
            cycle: Vec<String>,
        },
        /// Missing dependency detected
        MissingDependency {
            /// The bean that requires the dependency
            bean: String,
            /// The missing dependency
            missing: String,
        },
    }

    impl std::fmt::Display for DependencyValidationError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::CircularDependency { cycle } => {
                    write!(f, "Circular dependency detected: {}", cycle.join(" -> "))
                }
                Self::MissingDependency { bean, missing } => {
                    write!(f, "Bean '{}' depends on '{}' which is not registered", bean, missing)
                }
            }
        }
    }

    /// Validates the declared `depends_on` graph for missing beans and cycles.
    ///
    /// Beans are visited in the given order so the reported cycle is stable.
    pub fn validate_dependency_graph(
        order: &[String],
        dependencies: &HashMap<String, Vec<String>>,
    ) -> Result<(), DependencyValidationError> {
        for bean_name in order {
            for dep in dependencies.get(bean_name).into_iter().flatten() {
                if !dependencies.contains_key(dep) {
                    return Err(DependencyValidationError::MissingDependency {
                        bean: bean_name.clone(),
                        missing: dep.clone(),
                    });
                }
            }
        }

        let mut visited = HashSet::new();
        let mut rec_stack = Vec::new();

        for bean_name in order {
            if !visited.contains(bean_name) {
                if let Some(cycle) =
                    detect_cycle_dfs(bean_name, dependencies, &mut visited, &mut rec_stack)
                {
                    return Err(DependencyValidationError::CircularDependency { cycle });
                }
            }
        }

        Ok(())
    }

    fn detect_cycle_dfs(
        node: &str,
        graph: &HashMap<String, Vec<String>>,
        visited: &mut HashSet<String>,
        rec_stack: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        visited.insert(node.to_string());
        rec_stack.push(node.to_string());

        for dep in graph.get(node).into_iter().flatten() {
            if let Some(start_idx) = rec_stack.iter().position(|x| x == dep) {
                let mut cycle = rec_stack[start_idx..].to_vec();
                cycle.push(dep.clone());
                return Some(cycle);
            }
            if !visited.contains(dep) {
                if let Some(cycle) = detect_cycle_dfs(dep, graph, visited, rec_stack) {
                    return Some(cycle);
                }
            }
        }

        rec_stack.pop();
        None
    }
}

#[cfg(test)]
mod tests {
    mod naming_tests {
        use super::super::naming::*;

        #[test]
        fn test_to_camel_case() {
            assert_eq!(to_camel_case("UserService"), "userService");
            assert_eq!(to_camel_case("AB"), "aB");
            assert_eq!(to_camel_case("lowerCase"), "lowerCase");
        }

        #[test]
        fn test_default_bean_name() {
            struct TaskExecutor;
            assert_eq!(default_bean_name::<TaskExecutor>(), "taskExecutor");
            assert_eq!(default_bean_name::<String>(), "string");
        }
    }

    mod dependency_tests {
        use super::super::dependency::*;
        use std::collections::HashMap;
        use std::sync::Arc;

        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }

        #[test]
        fn test_creation_tracker() {
            let tracker = CreationTracker::new();
            assert!(!tracker.is_creating("serviceA"));

            assert!(tracker.start_creating("serviceA"));
            assert!(tracker.is_creating("serviceA"));

            // re-entry on the same thread is a cycle
            assert!(!tracker.start_creating("serviceA"));

            assert!(tracker.start_creating("serviceB"));
            assert_eq!(tracker.current_creating(), names(&["serviceA", "serviceB"]));

            tracker.finish_creating("serviceB");
            tracker.finish_creating("serviceA");
            assert!(!tracker.is_creating("serviceA"));
            assert!(tracker.current_creating().is_empty());
        }

        #[test]
        fn test_creation_tracker_is_per_thread() {
            let tracker = Arc::new(CreationTracker::new());
            assert!(tracker.start_creating("shared"));

            let other = Arc::clone(&tracker);
            let started_elsewhere = std::thread::spawn(move || {
                let started = other.start_creating("shared");
                other.finish_creating("shared");
                started
            })
            .join()
            .unwrap();

            assert!(started_elsewhere);
            assert!(tracker.is_creating("shared"));
        }

        #[test]
        fn test_validate_missing_dependency() {
            let mut deps = HashMap::new();
            deps.insert("serviceA".to_string(), names(&["serviceB"]));

            match validate_dependency_graph(&names(&["serviceA"]), &deps) {
                Err(DependencyValidationError::MissingDependency { bean, missing }) => {
                    assert_eq!(bean, "serviceA");
                    assert_eq!(missing, "serviceB");
                }
                other => panic!("Expected MissingDependency error, got {:?}", other),
            }
        }

        #[test]
        fn test_validate_circular_dependency() {
            let mut deps = HashMap::new();
            deps.insert("serviceA".to_string(), names(&["serviceB"]));
            deps.insert("serviceB".to_string(), names(&["serviceC"]));
            deps.insert("serviceC".to_string(), names(&["serviceA"]));

            let order = names(&["serviceA", "serviceB", "serviceC"]);
            match validate_dependency_graph(&order, &deps) {
                Err(DependencyValidationError::CircularDependency { cycle }) => {
                    assert_eq!(cycle, names(&["serviceA", "serviceB", "serviceC", "serviceA"]));
                }
                other => panic!("Expected CircularDependency error, got {:?}", other),
            }
        }

        #[test]
        fn test_validate_self_dependency() {
            let mut deps = HashMap::new();
            deps.insert("serviceA".to_string(), names(&["serviceA"]));

            match validate_dependency_graph(&names(&["serviceA"]), &deps) {
                Err(DependencyValidationError::CircularDependency { cycle }) => {
                    assert_eq!(cycle.len(), 2);
                }
                other => panic!("Expected CircularDependency error, got {:?}", other),
            }
        }

        #[test]
        fn test_validate_valid_graph() {
            let mut deps = HashMap::new();
            deps.insert("config".to_string(), vec![]);
            deps.insert("database".to_string(), names(&["config"]));
            deps.insert("userService".to_string(), names(&["database", "config"]));

            let order = names(&["config", "database", "userService"]);
            assert!(validate_dependency_graph(&order, &deps).is_ok());
        }
    }
}
