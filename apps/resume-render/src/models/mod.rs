pub mod resume;

pub use resume::{
    Education, Experience, PersonalInfo, Project, ResumeRecord, SkillCategory, SkillGroup,
    SkillSubgroup, Technologies,
};
