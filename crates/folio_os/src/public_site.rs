#![forbid(unsafe_code)]

use folio_contracts::content::{
    HeroContent, HeroContentKind, PortfolioSettingsKind, Project, ProjectKind, Skill, SkillKind,
    TeamMember, TeamMemberKind,
};
use folio_contracts::{MonotonicTimeNs, RecordId};
use folio_storage::repo::ContentTablesRepo;
use serde::Serialize;
use tracing::warn;

pub const DEFAULT_CONTACT_EMAIL: &str = "hello@example.com";
pub const DEFAULT_CONTACT_PHONE: &str = "+1 (555) 123-4567";

const FALLBACK_SKILLS: [(&str, u8, &str); 15] = [
    ("React", 90, "Frontend"),
    ("TypeScript", 85, "Frontend"),
    ("Vue.js", 80, "Frontend"),
    ("Tailwind CSS", 90, "Frontend"),
    ("Next.js", 75, "Frontend"),
    ("Node.js", 85, "Backend"),
    ("Python", 80, "Backend"),
    ("Express.js", 85, "Backend"),
    ("PostgreSQL", 75, "Backend"),
    ("MongoDB", 80, "Backend"),
    ("Git", 90, "Tools & Others"),
    ("Docker", 70, "Tools & Others"),
    ("AWS", 65, "Tools & Others"),
    ("Figma", 75, "Tools & Others"),
    ("Jest", 80, "Tools & Others"),
];

/// Skill list shown when the skills table is empty or unreachable.
pub fn fallback_skills() -> Vec<Skill> {
    FALLBACK_SKILLS
        .iter()
        .enumerate()
        .filter_map(|(i, (name, level, category))| {
            Some(Skill {
                id: RecordId::new((i + 1).to_string()).ok()?,
                name: name.to_string(),
                level: *level,
                category: category.to_string(),
                created_at: MonotonicTimeNs(0),
                updated_at: MonotonicTimeNs(0),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillGroup {
    pub category: String,
    pub skills: Vec<Skill>,
}

/// Groups by category in order of first appearance.
pub fn group_skills(skills: Vec<Skill>) -> Vec<SkillGroup> {
    let mut groups: Vec<SkillGroup> = Vec::new();
    for skill in skills {
        match groups.iter_mut().find(|g| g.category == skill.category) {
            Some(group) => group.skills.push(skill),
            None => groups.push(SkillGroup {
                category: skill.category.clone(),
                skills: vec![skill],
            }),
        }
    }
    groups
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactInfo {
    pub email: String,
    pub phone: String,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HomePage {
    pub hero: Option<HeroContent>,
    pub projects: Vec<Project>,
    pub skill_groups: Vec<SkillGroup>,
    pub skills_from_fallback: bool,
    pub team: Vec<TeamMember>,
    pub contact: ContactInfo,
}

/// Anonymous home page. Touches only the public content tables; a failed
/// section renders empty rather than failing the page.
pub fn load_home_page<B: ContentTablesRepo>(backend: &B) -> HomePage {
    let hero = backend
        .fetch_singleton_row::<HeroContentKind>()
        .unwrap_or_else(|err| {
            warn!(error = %err, "hero content unavailable");
            None
        });
    let settings = backend
        .fetch_singleton_row::<PortfolioSettingsKind>()
        .unwrap_or_else(|err| {
            warn!(error = %err, "portfolio settings unavailable");
            None
        });
    let projects = load_projects(backend);
    let team = backend
        .list_content_rows::<TeamMemberKind>()
        .unwrap_or_else(|err| {
            warn!(error = %err, "team members unavailable");
            Vec::new()
        });

    let (skills, skills_from_fallback) = match backend.list_content_rows::<SkillKind>() {
        Ok(rows) if !rows.is_empty() => (rows, false),
        Ok(_) => (fallback_skills(), true),
        Err(err) => {
            warn!(error = %err, "skills unavailable, showing fallback list");
            (fallback_skills(), true)
        }
    };

    let contact = ContactInfo {
        email: settings
            .as_ref()
            .map(|s| s.fields.contact_email.clone())
            .unwrap_or_else(|| DEFAULT_CONTACT_EMAIL.to_string()),
        phone: settings
            .as_ref()
            .map(|s| s.fields.phone.clone())
            .unwrap_or_else(|| DEFAULT_CONTACT_PHONE.to_string()),
        github_url: hero.as_ref().and_then(|h| h.github_url.clone()),
        linkedin_url: hero.as_ref().and_then(|h| h.linkedin_url.clone()),
    };

    HomePage {
        hero,
        projects,
        skill_groups: group_skills(skills),
        skills_from_fallback,
        team,
        contact,
    }
}

/// `/projects` listing, newest first.
pub fn load_projects<B: ContentTablesRepo>(backend: &B) -> Vec<Project> {
    backend
        .list_content_rows::<ProjectKind>()
        .unwrap_or_else(|err| {
            warn!(error = %err, "projects unavailable");
            Vec::new()
        })
}

pub fn find_project<B: ContentTablesRepo>(backend: &B, id: &str) -> Option<Project> {
    load_projects(backend)
        .into_iter()
        .find(|p| p.id.as_str() == id)
}
