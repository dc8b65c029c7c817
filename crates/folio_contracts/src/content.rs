#![forbid(unsafe_code)]

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::common::{
    double_option, validate_id, validate_optional_text, validate_text, validate_text_list,
};
use crate::permissions::ContentArea;
use crate::{ContractViolation, MonotonicTimeNs, RecordId, Validate};

/// Where a freshly created row lands in a cached list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPlacement {
    Prepend,
    Append,
}

pub trait ContentRow: Clone + Debug + PartialEq + Serialize + DeserializeOwned {
    fn id(&self) -> &RecordId;
    fn created_at(&self) -> MonotonicTimeNs;
}

/// One list-shaped content table.
pub trait ContentKind {
    const TABLE: &'static str;
    const LABEL: &'static str;
    /// Area whose write flag guards mutations of this table.
    const AREA: ContentArea;
    const PLACEMENT: InsertPlacement;

    type Record: ContentRow;
    type Create: Validate + Clone + Debug + Serialize + DeserializeOwned;
    type Update: Validate + Clone + Debug + Serialize + DeserializeOwned;

    fn build(id: RecordId, input: Self::Create, now: MonotonicTimeNs) -> Self::Record;
    fn apply_update(record: &mut Self::Record, update: Self::Update, now: MonotonicTimeNs);
    /// Listing order returned by the backend.
    fn sort(rows: &mut [Self::Record]);
}

/// A table consumed as "fetch the one row".
pub trait SingletonKind {
    const TABLE: &'static str;
    const LABEL: &'static str;
    const AREA: ContentArea;

    type Record: ContentRow;
    type Update: Validate + Clone + Debug + Serialize + DeserializeOwned;

    fn apply_update(record: &mut Self::Record, update: Self::Update, now: MonotonicTimeNs);
}

fn newest_first<T: ContentRow>(rows: &mut [T]) {
    rows.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });
}

// ---------------------------------------------------------------------------
// projects

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectInput {
    pub title: String,
    pub description: String,
    pub image: String,
    pub technologies: Vec<String>,
    pub github_url: String,
    pub live_url: String,
    pub year: String,
    #[serde(default)]
    pub detailed_description: Option<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub challenges: Vec<String>,
    #[serde(default)]
    pub solutions: Vec<String>,
    #[serde(default)]
    pub gallery_images: Vec<String>,
    #[serde(default)]
    pub demo_video_url: Option<String>,
    #[serde(default)]
    pub project_duration: Option<String>,
    #[serde(default)]
    pub team_size: Option<u32>,
    #[serde(default)]
    pub project_status: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub project_category: Option<String>,
}

impl Validate for ProjectInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("project.title", &self.title, 200)?;
        validate_text("project.description", &self.description, 4000)?;
        validate_optional_text("project.image", Some(self.image.as_str()), 2048)?;
        validate_text_list("project.technologies", &self.technologies, 64, 64)?;
        validate_optional_text("project.github_url", Some(self.github_url.as_str()), 2048)?;
        validate_optional_text("project.live_url", Some(self.live_url.as_str()), 2048)?;
        validate_text("project.year", &self.year, 16)?;
        validate_optional_text(
            "project.detailed_description",
            self.detailed_description.as_deref(),
            20_000,
        )?;
        for (field, list) in [
            ("project.goals", &self.goals),
            ("project.objectives", &self.objectives),
            ("project.features", &self.features),
            ("project.challenges", &self.challenges),
            ("project.solutions", &self.solutions),
            ("project.gallery_images", &self.gallery_images),
        ] {
            validate_text_list(field, list, 64, 2048)?;
        }
        if self.team_size == Some(0) {
            return Err(ContractViolation::InvalidValue {
                field: "project.team_size",
                reason: "must be > 0 when provided",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: ProjectInput,
    pub created_at: MonotonicTimeNs,
    pub updated_at: MonotonicTimeNs,
}

impl ContentRow for Project {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn created_at(&self) -> MonotonicTimeNs {
        self.created_at
    }
}

pub struct ProjectKind;

impl ContentKind for ProjectKind {
    const TABLE: &'static str = "projects";
    const LABEL: &'static str = "Project";
    const AREA: ContentArea = ContentArea::Projects;
    const PLACEMENT: InsertPlacement = InsertPlacement::Prepend;

    type Record = Project;
    type Create = ProjectInput;
    type Update = ProjectInput;

    fn build(id: RecordId, input: ProjectInput, now: MonotonicTimeNs) -> Project {
        Project {
            id,
            fields: input,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_update(record: &mut Project, update: ProjectInput, now: MonotonicTimeNs) {
        record.fields = update;
        record.updated_at = now;
    }

    fn sort(rows: &mut [Project]) {
        newest_first(rows);
    }
}

// ---------------------------------------------------------------------------
// team members

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamMemberInput {
    pub name: String,
    pub role: String,
    pub bio: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Validate for TeamMemberInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("team_member.name", &self.name, 200)?;
        validate_text("team_member.role", &self.role, 200)?;
        validate_text("team_member.bio", &self.bio, 4000)?;
        validate_optional_text("team_member.image", Some(self.image.as_str()), 2048)?;
        validate_text_list("team_member.skills", &self.skills, 64, 64)?;
        validate_optional_text("team_member.github", self.github.as_deref(), 2048)?;
        validate_optional_text("team_member.linkedin", self.linkedin.as_deref(), 2048)?;
        validate_optional_text("team_member.email", self.email.as_deref(), 254)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: TeamMemberInput,
    pub created_at: MonotonicTimeNs,
    pub updated_at: MonotonicTimeNs,
}

impl ContentRow for TeamMember {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn created_at(&self) -> MonotonicTimeNs {
        self.created_at
    }
}

pub struct TeamMemberKind;

impl ContentKind for TeamMemberKind {
    const TABLE: &'static str = "team_members";
    const LABEL: &'static str = "Team member";
    const AREA: ContentArea = ContentArea::Team;
    const PLACEMENT: InsertPlacement = InsertPlacement::Prepend;

    type Record = TeamMember;
    type Create = TeamMemberInput;
    type Update = TeamMemberInput;

    fn build(id: RecordId, input: TeamMemberInput, now: MonotonicTimeNs) -> TeamMember {
        TeamMember {
            id,
            fields: input,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_update(record: &mut TeamMember, update: TeamMemberInput, now: MonotonicTimeNs) {
        record.fields = update;
        record.updated_at = now;
    }

    fn sort(rows: &mut [TeamMember]) {
        newest_first(rows);
    }
}

// ---------------------------------------------------------------------------
// skills

pub const SKILL_LEVEL_MAX: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInput {
    pub name: String,
    pub level: u8,
    pub category: String,
}

impl Validate for SkillInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("skill.name", &self.name, 96)?;
        validate_skill_level(self.level)?;
        validate_text("skill.category", &self.category, 96)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Validate for SkillPatch {
    fn validate(&self) -> Result<(), ContractViolation> {
        if let Some(name) = &self.name {
            validate_text("skill.name", name, 96)?;
        }
        if let Some(level) = self.level {
            validate_skill_level(level)?;
        }
        if let Some(category) = &self.category {
            validate_text("skill.category", category, 96)?;
        }
        Ok(())
    }
}

fn validate_skill_level(level: u8) -> Result<(), ContractViolation> {
    if level > SKILL_LEVEL_MAX {
        return Err(ContractViolation::InvalidRange {
            field: "skill.level",
            min: 0.0,
            max: SKILL_LEVEL_MAX as f64,
            got: level as f64,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: RecordId,
    pub name: String,
    pub level: u8,
    pub category: String,
    pub created_at: MonotonicTimeNs,
    pub updated_at: MonotonicTimeNs,
}

impl ContentRow for Skill {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn created_at(&self) -> MonotonicTimeNs {
        self.created_at
    }
}

pub struct SkillKind;

impl ContentKind for SkillKind {
    const TABLE: &'static str = "skills";
    const LABEL: &'static str = "Skill";
    // Skills are managed alongside projects.
    const AREA: ContentArea = ContentArea::Projects;
    const PLACEMENT: InsertPlacement = InsertPlacement::Append;

    type Record = Skill;
    type Create = SkillInput;
    type Update = SkillPatch;

    fn build(id: RecordId, input: SkillInput, now: MonotonicTimeNs) -> Skill {
        Skill {
            id,
            name: input.name,
            level: input.level,
            category: input.category,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_update(record: &mut Skill, update: SkillPatch, now: MonotonicTimeNs) {
        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(level) = update.level {
            record.level = level;
        }
        if let Some(category) = update.category {
            record.category = category;
        }
        record.updated_at = now;
    }

    fn sort(rows: &mut [Skill]) {
        rows.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| b.level.cmp(&a.level))
                .then_with(|| a.id.cmp(&b.id))
        });
    }
}

// ---------------------------------------------------------------------------
// admin settings

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSettingInput {
    pub setting_key: String,
    pub setting_value: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Validate for AdminSettingInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("admin_setting.setting_key", &self.setting_key, 96)?;
        validate_optional_text(
            "admin_setting.setting_value",
            Some(self.setting_value.as_str()),
            4096,
        )?;
        validate_optional_text(
            "admin_setting.description",
            self.description.as_deref(),
            1024,
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSettingPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Validate for AdminSettingPatch {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_optional_text(
            "admin_setting.setting_value",
            self.setting_value.as_deref(),
            4096,
        )?;
        validate_optional_text(
            "admin_setting.description",
            self.description.as_deref(),
            1024,
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSetting {
    pub id: RecordId,
    pub setting_key: String,
    pub setting_value: String,
    pub description: Option<String>,
    pub created_at: MonotonicTimeNs,
    pub updated_at: MonotonicTimeNs,
}

impl ContentRow for AdminSetting {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn created_at(&self) -> MonotonicTimeNs {
        self.created_at
    }
}

pub struct AdminSettingKind;

impl ContentKind for AdminSettingKind {
    const TABLE: &'static str = "admin_settings";
    const LABEL: &'static str = "Setting";
    const AREA: ContentArea = ContentArea::Settings;
    const PLACEMENT: InsertPlacement = InsertPlacement::Append;

    type Record = AdminSetting;
    type Create = AdminSettingInput;
    type Update = AdminSettingPatch;

    fn build(id: RecordId, input: AdminSettingInput, now: MonotonicTimeNs) -> AdminSetting {
        AdminSetting {
            id,
            setting_key: input.setting_key,
            setting_value: input.setting_value,
            description: input.description,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_update(record: &mut AdminSetting, update: AdminSettingPatch, now: MonotonicTimeNs) {
        if let Some(value) = update.setting_value {
            record.setting_value = value;
        }
        if let Some(description) = update.description {
            record.description = Some(description);
        }
        record.updated_at = now;
    }

    fn sort(rows: &mut [AdminSetting]) {
        rows.sort_by(|a, b| a.setting_key.cmp(&b.setting_key));
    }
}

// ---------------------------------------------------------------------------
// hero content (singleton)

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroContent {
    pub id: RecordId,
    pub main_heading: String,
    pub subtitle: String,
    pub description: String,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub email_url: Option<String>,
    pub created_at: MonotonicTimeNs,
    pub updated_at: MonotonicTimeNs,
}

impl ContentRow for HeroContent {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn created_at(&self) -> MonotonicTimeNs {
        self.created_at
    }
}

/// `Some(None)` on a link clears it; in JSON that is an explicit `null`,
/// while an absent key leaves the link alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroContentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub github_url: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub linkedin_url: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub email_url: Option<Option<String>>,
}

impl Validate for HeroContentPatch {
    fn validate(&self) -> Result<(), ContractViolation> {
        if let Some(v) = &self.main_heading {
            validate_text("hero_content.main_heading", v, 200)?;
        }
        if let Some(v) = &self.subtitle {
            validate_text("hero_content.subtitle", v, 300)?;
        }
        if let Some(v) = &self.description {
            validate_text("hero_content.description", v, 4000)?;
        }
        for (field, link) in [
            ("hero_content.github_url", &self.github_url),
            ("hero_content.linkedin_url", &self.linkedin_url),
            ("hero_content.email_url", &self.email_url),
        ] {
            validate_optional_text(field, link.as_ref().and_then(|v| v.as_deref()), 2048)?;
        }
        Ok(())
    }
}

pub struct HeroContentKind;

impl SingletonKind for HeroContentKind {
    const TABLE: &'static str = "hero_content";
    const LABEL: &'static str = "Hero content";
    const AREA: ContentArea = ContentArea::Hero;

    type Record = HeroContent;
    type Update = HeroContentPatch;

    fn apply_update(record: &mut HeroContent, update: HeroContentPatch, now: MonotonicTimeNs) {
        if let Some(v) = update.main_heading {
            record.main_heading = v;
        }
        if let Some(v) = update.subtitle {
            record.subtitle = v;
        }
        if let Some(v) = update.description {
            record.description = v;
        }
        if let Some(v) = update.github_url {
            record.github_url = v;
        }
        if let Some(v) = update.linkedin_url {
            record.linkedin_url = v;
        }
        if let Some(v) = update.email_url {
            record.email_url = v;
        }
        record.updated_at = now;
    }
}

// ---------------------------------------------------------------------------
// portfolio settings (singleton)

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSettingsInput {
    pub portfolio_title: String,
    pub contact_email: String,
    pub phone: String,
}

impl Validate for PortfolioSettingsInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("portfolio_settings.portfolio_title", &self.portfolio_title, 200)?;
        validate_text("portfolio_settings.contact_email", &self.contact_email, 254)?;
        validate_optional_text("portfolio_settings.phone", Some(self.phone.as_str()), 64)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSettings {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: PortfolioSettingsInput,
    pub created_at: MonotonicTimeNs,
    pub updated_at: MonotonicTimeNs,
}

impl ContentRow for PortfolioSettings {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn created_at(&self) -> MonotonicTimeNs {
        self.created_at
    }
}

pub struct PortfolioSettingsKind;

impl SingletonKind for PortfolioSettingsKind {
    const TABLE: &'static str = "portfolio_settings";
    const LABEL: &'static str = "Settings";
    const AREA: ContentArea = ContentArea::Settings;

    type Record = PortfolioSettings;
    type Update = PortfolioSettingsInput;

    fn apply_update(
        record: &mut PortfolioSettings,
        update: PortfolioSettingsInput,
        now: MonotonicTimeNs,
    ) {
        record.fields = update;
        record.updated_at = now;
    }
}
