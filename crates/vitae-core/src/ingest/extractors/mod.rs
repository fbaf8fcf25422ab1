//! Per-field extractors registered by [`CompositeExtractor`](super::CompositeExtractor).

mod certifications;
mod contact;
mod education;
mod experience;
mod projects;
mod skills;

pub use certifications::CertificationsExtractor;
pub use contact::ContactExtractor;
pub use education::EducationExtractor;
pub use experience::ExperienceExtractor;
pub use projects::ProjectsExtractor;
pub use skills::SkillsExtractor;
