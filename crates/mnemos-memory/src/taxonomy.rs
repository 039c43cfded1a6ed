//! Static two-level category tables used by the classifier.

/// A root category and the subcategories that may follow it in a path.
#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub name: &'static str,
    pub subcategories: &'static [&'static str],
}

/// An ordered list of root categories.
#[derive(Debug, Clone, Copy)]
pub struct Taxonomy {
    pub roots: &'static [Category],
}

/// Subject-matter hierarchy.
pub static TOPICS: Taxonomy = Taxonomy {
    roots: &[
        Category {
            name: "Programming",
            subcategories: &[
                "Frontend",
                "Backend",
                "DevOps",
                "Mobile",
                "Desktop",
                "Languages",
                "Frameworks",
                "Libraries",
                "Tools",
            ],
        },
        Category {
            name: "Frontend",
            subcategories: &[
                "React",
                "Vue",
                "Angular",
                "HTML",
                "CSS",
                "JavaScript",
                "TypeScript",
            ],
        },
        Category {
            name: "Backend",
            subcategories: &["Python", "Node.js", "Java", "Go", "Rust", "APIs", "Databases"],
        },
        Category {
            name: "DevOps",
            subcategories: &[
                "Docker",
                "Kubernetes",
                "CI/CD",
                "Monitoring",
                "Cloud",
                "Infrastructure",
            ],
        },
        Category {
            name: "Problem Solving",
            subcategories: &[
                "Debugging",
                "Optimization",
                "Architecture",
                "Design Patterns",
                "Algorithms",
            ],
        },
        Category {
            name: "Project Management",
            subcategories: &[
                "Planning",
                "Task Management",
                "Documentation",
                "Testing",
                "Deployment",
            ],
        },
    ],
};

/// Activity hierarchy.
pub static SKILLS: Taxonomy = Taxonomy {
    roots: &[
        Category {
            name: "Development",
            subcategories: &["Coding", "Debugging", "Testing", "Refactoring", "Code Review"],
        },
        Category {
            name: "Design",
            subcategories: &["Architecture", "UI/UX", "System Design", "Database Design"],
        },
        Category {
            name: "Analysis",
            subcategories: &["Problem Analysis", "Performance Analysis", "Code Analysis"],
        },
        Category {
            name: "Communication",
            subcategories: &["Documentation", "Explanation", "Teaching", "Collaboration"],
        },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_roots_are_unique_and_populated() {
        for taxonomy in [&TOPICS, &SKILLS] {
            let mut seen = HashSet::new();
            for root in taxonomy.roots {
                assert!(seen.insert(root.name.to_lowercase()), "duplicate root {}", root.name);
                assert!(!root.subcategories.is_empty());
            }
        }
    }

    #[test]
    fn test_skill_table_order() {
        let first = &SKILLS.roots[0];
        assert_eq!(first.name, "Development");
        assert_eq!(&first.subcategories[..2], &["Coding", "Debugging"]);
    }
}
