//! Element names of `web.xml`.

pub const WEB_APP: &str = "web-app";
pub const ICON: &str = "icon";
pub const DISPLAY_NAME: &str = "display-name";
pub const DESCRIPTION: &str = "description";
pub const DISTRIBUTABLE: &str = "distributable";
pub const CONTEXT_PARAM: &str = "context-param";
pub const PARAM_NAME: &str = "param-name";
pub const PARAM_VALUE: &str = "param-value";
pub const FILTER: &str = "filter";
pub const FILTER_NAME: &str = "filter-name";
pub const FILTER_CLASS: &str = "filter-class";
pub const FILTER_MAPPING: &str = "filter-mapping";
pub const DISPATCHER: &str = "dispatcher";
pub const INIT_PARAM: &str = "init-param";
pub const LISTENER: &str = "listener";
pub const LISTENER_CLASS: &str = "listener-class";
pub const SERVLET: &str = "servlet";
pub const SERVLET_NAME: &str = "servlet-name";
pub const SERVLET_CLASS: &str = "servlet-class";
pub const JSP_FILE: &str = "jsp-file";
pub const LOAD_ON_STARTUP: &str = "load-on-startup";
pub const RUN_AS: &str = "run-as";
pub const SERVLET_MAPPING: &str = "servlet-mapping";
pub const URL_PATTERN: &str = "url-pattern";
pub const SESSION_CONFIG: &str = "session-config";
pub const MIME_MAPPING: &str = "mime-mapping";
pub const EXTENSION: &str = "extension";
pub const MIME_TYPE: &str = "mime-type";
pub const WELCOME_FILE_LIST: &str = "welcome-file-list";
pub const ERROR_PAGE: &str = "error-page";
pub const ERROR_CODE: &str = "error-code";
pub const EXCEPTION_TYPE: &str = "exception-type";
pub const TAGLIB: &str = "taglib";
pub const RESOURCE_ENV_REF: &str = "resource-env-ref";
pub const RESOURCE_REF: &str = "resource-ref";
pub const SECURITY_CONSTRAINT: &str = "security-constraint";
pub const WEB_RESOURCE_COLLECTION: &str = "web-resource-collection";
pub const WEB_RESOURCE_NAME: &str = "web-resource-name";
pub const AUTH_CONSTRAINT: &str = "auth-constraint";
pub const LOGIN_CONFIG: &str = "login-config";
pub const AUTH_METHOD: &str = "auth-method";
pub const REALM_NAME: &str = "realm-name";
pub const SECURITY_ROLE: &str = "security-role";
pub const ROLE_NAME: &str = "role-name";
pub const ENV_ENTRY: &str = "env-entry";
pub const EJB_REF: &str = "ejb-ref";
pub const EJB_LOCAL_REF: &str = "ejb-local-ref";
pub const EJB_REF_NAME: &str = "ejb-ref-name";
pub const EJB_REF_TYPE: &str = "ejb-ref-type";
pub const LOCAL: &str = "local";
pub const LOCAL_HOME: &str = "local-home";
pub const REMOTE: &str = "remote";
pub const HOME: &str = "home";
pub const EJB_LINK: &str = "ejb-link";
