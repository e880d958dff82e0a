use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Sample TourAPI export with three sites
pub const TOUR_FIXTURE: &str = r#"{
  "response": {
    "body": {
      "items": {
        "item": [
          {
            "contentid": "126",
            "contenttypeid": "12",
            "cat1": "A01",
            "title": "빙계계곡",
            "addr1": "경상북도 의성군 춘산면 빙계리",
            "overview": "여름에도 얼음이 어는 신비한 계곡",
            "mapx": "128.6758",
            "mapy": "36.3712"
          },
          {
            "contentid": "127",
            "contenttypeid": "28",
            "title": "의성마늘 체험장",
            "overview": "의성 마늘 수확 체험"
          },
          {
            "contentid": "128",
            "contenttypeid": "14",
            "title": "조문국박물관",
            "overview": "조문국 유물 전시",
            "price": 2000
          }
        ]
      }
    }
  }
}"#;

/// A temporary working directory for running the CLI.
pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the project root, creating parent dirs as needed.
    pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
        let full = self.dir.path().join(relative_path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        std::fs::write(&full, content).expect("failed to write file");
        full
    }

    pub fn write_tour_fixture(&self) -> PathBuf {
        self.write_file("tour.json", TOUR_FIXTURE)
    }

    /// Command for the uscheck binary running inside this directory, isolated
    /// from the caller's Google and Gemini settings.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::new(Self::uscheck_bin());
        cmd.current_dir(self.path());
        for var in ENV_VARS {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Return the path to the uscheck binary (built via cargo).
    pub fn uscheck_bin() -> PathBuf {
        PathBuf::from(env!("CARGO_BIN_EXE_uscheck"))
    }
}

/// Environment variables the binary reads
pub const ENV_VARS: &[&str] = &[
    "GEMINI_API_KEY",
    "GOOGLE_OAUTH_ACCESS_TOKEN",
    "FIRESTORE_PROJECT_ID",
    "FIRESTORE_EMULATOR_HOST",
    "PORT",
    "SERVER_ADDRESS",
    "USCHECK_SERVER",
];
