//! Element names of `application.xml`.

pub const APPLICATION: &str = "application";
pub const ICON: &str = "icon";
pub const DISPLAY_NAME: &str = "display-name";
pub const DESCRIPTION: &str = "description";
pub const MODULE: &str = "module";
pub const CONNECTOR: &str = "connector";
pub const EJB: &str = "ejb";
pub const JAVA: &str = "java";
pub const WEB: &str = "web";
pub const WEB_URI: &str = "web-uri";
pub const CONTEXT_ROOT: &str = "context-root";
pub const ALT_DD: &str = "alt-dd";
pub const SECURITY_ROLE: &str = "security-role";
pub const ROLE_NAME: &str = "role-name";
