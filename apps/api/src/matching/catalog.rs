//! Fixed catalog of technologies users and projects can list.

pub const TECH_CHOICES: &[&str] = &[
    "Python",
    "Django",
    "Flask",
    "JavaScript",
    "React",
    "Vue",
    "Angular",
    "Node.js",
    "Express",
    "HTML/CSS",
    "Bootstrap",
    "Tailwind CSS",
    "PHP",
    "Laravel",
    "CodeIgniter",
    "Ruby",
    "Ruby on Rails",
    "Java",
    "Spring",
    "C#",
    ".NET",
    "Go",
    "Rust",
    "Swift",
    "Kotlin",
    "SQL",
    "PostgreSQL",
    "MySQL",
    "MongoDB",
    "Redis",
    "Firebase",
    "Docker",
    "Kubernetes",
    "AWS",
    "Azure",
    "Google Cloud",
    "GraphQL",
    "REST API",
    "WebSockets",
    "Microservices",
    "Machine Learning",
    "Data Science",
    "UI/UX Design",
    "Mobile Development",
];

/// Returns the catalog spelling of `entry`, matched case-insensitively.
pub fn canonical_tech(entry: &str) -> Option<&'static str> {
    let entry = entry.trim();
    TECH_CHOICES
        .iter()
        .copied()
        .find(|choice| choice.eq_ignore_ascii_case(entry))
}
