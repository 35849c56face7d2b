/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! Container resource accounting from the cgroup filesystem.

use std::path::Path;
use std::path::PathBuf;

/// Resource usage of a single container. Unavailable values are `None`.
#[derive(Debug, Default, PartialEq)]
pub struct CgroupStats {
    pub cpu_usage_seconds: Option<f64>,
    pub memory_usage_bytes: Option<f64>,
    pub memory_limit_bytes: Option<f64>,
}

/** Reads container accounting below `{cgroup_root}` and the configured parent
cgroup.

Both the unified hierarchy (v2, `{root}{parent}/{id}`) and the per-controller
hierarchy (v1, `{root}/{controller}{parent}/{id}`) are supported. A systemd
managed parent uses `docker-{id}.scope` as directory name.
*/
pub struct CgroupReader {
    cgroup_root: PathBuf,
    parent: String,
}

impl CgroupReader {
    /// v1 reports "unlimited" as a huge page aligned number.
    const V1_UNLIMITED_THRESHOLD: f64 = 4_611_686_018_427_387_904.0;

    /// Return a new instance.
    pub fn new(cgroup_root: &str, parent: &str) -> Self {
        Self {
            cgroup_root: PathBuf::from(cgroup_root),
            parent: parent.trim_matches('/').to_owned(),
        }
    }

    /// Read the available accounting of a container.
    pub async fn read(&self, container_id: &str) -> CgroupStats {
        if tokio::fs::try_exists(self.cgroup_root.join("cgroup.controllers"))
            .await
            .unwrap_or(false)
        {
            self.read_unified(container_id).await
        } else {
            self.read_per_controller(container_id).await
        }
    }

    async fn read_unified(&self, container_id: &str) -> CgroupStats {
        let Some(dir) = self.container_dir(&self.cgroup_root, container_id).await else {
            return CgroupStats::default();
        };
        CgroupStats {
            cpu_usage_seconds: Self::read_string(&dir.join("cpu.stat"))
                .await
                .and_then(|content| Self::parse_cpu_stat_usage_usec(&content))
                .map(|usec| usec / 1_000_000.0),
            memory_usage_bytes: Self::read_number(&dir.join("memory.current")).await,
            // "max" means unlimited and fails to parse
            memory_limit_bytes: Self::read_number(&dir.join("memory.max")).await,
        }
    }

    async fn read_per_controller(&self, container_id: &str) -> CgroupStats {
        let cpu_usage_seconds =
            match self
                .container_dir(&self.cgroup_root.join("cpuacct"), container_id)
                .await
            {
                Some(dir) => Self::read_number(&dir.join("cpuacct.usage"))
                    .await
                    .map(|nanos| nanos / 1_000_000_000.0),
                None => None,
            };
        let (memory_usage_bytes, memory_limit_bytes) = match self
            .container_dir(&self.cgroup_root.join("memory"), container_id)
            .await
        {
            Some(dir) => (
                Self::read_number(&dir.join("memory.usage_in_bytes")).await,
                Self::read_number(&dir.join("memory.limit_in_bytes"))
                    .await
                    .filter(|limit| *limit < Self::V1_UNLIMITED_THRESHOLD),
            ),
            None => (None, None),
        };
        CgroupStats {
            cpu_usage_seconds,
            memory_usage_bytes,
            memory_limit_bytes,
        }
    }

    /// Locate the container's cgroup directory below `base`.
    async fn container_dir(&self, base: &Path, container_id: &str) -> Option<PathBuf> {
        let parent_dir = if self.parent.is_empty() {
            base.to_path_buf()
        } else {
            base.join(&self.parent)
        };
        for candidate in [
            parent_dir.join(container_id),
            parent_dir.join(format!("docker-{container_id}.scope")),
        ] {
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
        }
        log::trace!("No cgroup for container '{container_id}' below '{}'.", parent_dir.display());
        None
    }

    async fn read_string(path: &Path) -> Option<String> {
        tokio::fs::read_to_string(path).await.ok()
    }

    async fn read_number(path: &Path) -> Option<f64> {
        Self::read_string(path)
            .await
            .and_then(|content| content.trim().parse::<f64>().ok())
    }

    /// Extract `usage_usec` from a v2 `cpu.stat`.
    fn parse_cpu_stat_usage_usec(content: &str) -> Option<f64> {
        content.lines().find_map(|line| {
            line.strip_prefix("usage_usec ")
                .and_then(|value| value.trim().parse::<f64>().ok())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn reads_unified_hierarchy() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("cgroup.controllers"), "cpu memory").unwrap();
        let dir = root.path().join("docker").join("abc");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("cpu.stat"), "usage_usec 2500000\nuser_usec 2000000\n").unwrap();
        fs::write(dir.join("memory.current"), "1048576\n").unwrap();
        fs::write(dir.join("memory.max"), "max\n").unwrap();
        let reader = CgroupReader::new(root.path().to_str().unwrap(), "/docker");
        assert_eq!(
            reader.read("abc").await,
            CgroupStats {
                cpu_usage_seconds: Some(2.5),
                memory_usage_bytes: Some(1048576.0),
                memory_limit_bytes: None,
            }
        );
        assert_eq!(reader.read("missing").await, CgroupStats::default());
    }

    #[tokio::test]
    async fn reads_per_controller_hierarchy_with_systemd_scope() {
        let root = tempfile::tempdir().unwrap();
        let cpu_dir = root.path().join("cpuacct/system.slice/docker-abc.scope");
        let memory_dir = root.path().join("memory/system.slice/docker-abc.scope");
        fs::create_dir_all(&cpu_dir).unwrap();
        fs::create_dir_all(&memory_dir).unwrap();
        fs::write(cpu_dir.join("cpuacct.usage"), "3000000000\n").unwrap();
        fs::write(memory_dir.join("memory.usage_in_bytes"), "4096\n").unwrap();
        fs::write(memory_dir.join("memory.limit_in_bytes"), "9223372036854771712\n").unwrap();
        let reader = CgroupReader::new(root.path().to_str().unwrap(), "/system.slice");
        assert_eq!(
            reader.read("abc").await,
            CgroupStats {
                cpu_usage_seconds: Some(3.0),
                memory_usage_bytes: Some(4096.0),
                memory_limit_bytes: None,
            }
        );
        fs::write(memory_dir.join("memory.limit_in_bytes"), "536870912\n").unwrap();
        assert_eq!(reader.read("abc").await.memory_limit_bytes, Some(536870912.0));
    }
}
