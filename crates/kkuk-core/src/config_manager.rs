//! 설정 파일 관리.
//!
//! 플랫폼별 설정 디렉토리에 JSON 파일로 설정을 저장/로드한다.

use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::CoreError;

/// 설정 파일 이름
const CONFIG_FILE_NAME: &str = "config.json";

/// 설정 관리자
///
/// 설정 파일의 로드/저장을 관리한다. 파일이 없으면 기본 설정을
/// 생성해 저장한다.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 현재 설정
    config: AppConfig,
    /// 설정 파일 경로
    config_path: PathBuf,
}

impl ConfigManager {
    /// 플랫폼 기본 경로로 설정 관리자 생성
    pub fn new() -> Result<Self, CoreError> {
        Self::with_path(Self::default_config_path()?)
    }

    /// 지정된 경로로 설정 관리자 생성
    pub fn with_path(config_path: PathBuf) -> Result<Self, CoreError> {
        if let Some(parent) = config_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CoreError::Config(format!(
                        "설정 디렉토리 생성 실패: {}: {e}",
                        parent.display()
                    ))
                })?;
                info!("설정 디렉토리 생성: {}", parent.display());
            }
        }

        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let default_config = AppConfig::default_config();
            Self::save_to_file(&config_path, &default_config)?;
            info!("기본 설정 파일 생성: {}", config_path.display());
            default_config
        };

        Ok(Self {
            config,
            config_path,
        })
    }

    /// 현재 설정 스냅샷
    pub fn config(&self) -> AppConfig {
        self.config.clone()
    }

    /// 설정 교체 후 파일에 저장
    pub fn update(&mut self, config: AppConfig) -> Result<(), CoreError> {
        Self::save_to_file(&self.config_path, &config)?;
        self.config = config;
        debug!("설정 저장: {}", self.config_path.display());
        Ok(())
    }

    /// 설정 파일 경로
    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    fn default_config_path() -> Result<PathBuf, CoreError> {
        let dirs = ProjectDirs::from("", "", "kkuk")
            .ok_or_else(|| CoreError::Config("설정 디렉토리를 결정할 수 없음".to_string()))?;
        Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    fn load_from_file(path: &PathBuf) -> Result<AppConfig, CoreError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("설정 파일 읽기 실패: {}: {e}", path.display())))?;
        let config = serde_json::from_str(&contents)
            .map_err(|e| CoreError::Config(format!("설정 파일 파싱 실패: {}: {e}", path.display())))?;
        Ok(config)
    }

    fn save_to_file(path: &PathBuf, config: &AppConfig) -> Result<(), CoreError> {
        let contents = serde_json::to_string_pretty(config)?;
        fs::write(path, contents)
            .map_err(|e| CoreError::Config(format!("설정 파일 쓰기 실패: {}: {e}", path.display())))?;
        Ok(())
    }
}
