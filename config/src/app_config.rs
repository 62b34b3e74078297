use directories::ProjectDirs;
use std::{
    env,
    path::PathBuf,
};

pub(crate) const PROJECT_NAME: &str = "hcloud-usage-exporter";

lazy_static::lazy_static! {
    static ref ENV_PREFIX: String = PROJECT_NAME.replace('-', "_").to_uppercase();
    static ref DATA_FOLDER: Option<PathBuf> = env::var(format!("{}_DATA", ENV_PREFIX.as_str()))
        .ok()
        .map(PathBuf::from);
    static ref CONFIG_FOLDER: Option<PathBuf> = env::var(format!("{}_CONFIG", ENV_PREFIX.as_str()))
        .ok()
        .map(PathBuf::from);
}

/// Where the browser profile lives unless configured otherwise.
pub fn get_data_dir() -> PathBuf {
    if let Some(s) = DATA_FOLDER.clone() {
        s
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

/// Where `config.yaml` is looked up.
pub fn get_config_dir() -> PathBuf {
    if let Some(s) = CONFIG_FOLDER.clone() {
        s
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", PROJECT_NAME)
}
