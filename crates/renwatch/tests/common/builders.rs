//! Builder for synthetic job folders.
//!
//! Produces the manifest/log pair the render manager would drop into a
//! job folder, plus the render-output directory the manifest points at.

#![allow(dead_code)]

use std::path::PathBuf;

use super::harness::TestHarness;

pub struct JobFolderBuilder {
    folder: String,
    name: Option<String>,
    active: String,
    complete: String,
    computer: String,
    submitted: String,
    last_updated: String,
    description: String,
    log: String,
    preview: Option<String>,
    with_output: bool,
    with_manifest: bool,
    with_log: bool,
}

impl JobFolderBuilder {
    pub fn new(folder: &str) -> Self {
        Self {
            folder: folder.to_string(),
            name: None,
            active: "yes".to_string(),
            complete: "no".to_string(),
            computer: "RENDER-07".to_string(),
            submitted: "2026-08-20 18:02:11".to_string(),
            last_updated: "2026/08/21 07:45:00".to_string(),
            description: "BG 12".to_string(),
            log: "INF: frame 0001 done\n".to_string(),
            preview: None,
            with_output: true,
            with_manifest: true,
            with_log: true,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn active(mut self, active: &str) -> Self {
        self.active = active.to_string();
        self
    }

    pub fn complete(mut self, complete: &str) -> Self {
        self.complete = complete.to_string();
        self
    }

    pub fn log(mut self, log: &str) -> Self {
        self.log = log.to_string();
        self
    }

    pub fn with_error_log(self) -> Self {
        self.log("INF: frame 0001 done\nERR: render node timed out\n")
    }

    /// Drops a preview JPG with this name into the output directory.
    pub fn preview(mut self, file_name: &str) -> Self {
        self.preview = Some(file_name.to_string());
        self
    }

    pub fn without_output(mut self) -> Self {
        self.with_output = false;
        self
    }

    pub fn without_manifest(mut self) -> Self {
        self.with_manifest = false;
        self
    }

    pub fn without_log(mut self) -> Self {
        self.with_log = false;
        self
    }

    /// Writes the folder into the harness tree. Returns the render
    /// output directory the manifest points at.
    pub fn build(self, harness: &TestHarness) -> PathBuf {
        let job_dir = harness.jobs_root.join(&self.folder);
        std::fs::create_dir_all(&job_dir).unwrap();

        let output_dir = harness.outputs_root.join(&self.folder);
        if self.with_output {
            std::fs::create_dir_all(&output_dir).unwrap();
            if let Some(preview) = &self.preview {
                std::fs::write(output_dir.join(preview), b"jpg").unwrap();
            }
        }

        if self.with_manifest {
            let name = self.name.as_deref().unwrap_or(&self.folder);
            let output_tag = if self.with_output {
                format!(
                    "  <Output>\n    <Name>{}</Name>\n  </Output>\n",
                    output_dir.join("frame_0001.exr").display()
                )
            } else {
                String::new()
            };
            let xml = format!(
                "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
                 <JobDescription>\n\
                 <Job>\n\
                 \x20 <JobInfo>\n\
                 \x20   <Name>{name}</Name>\n\
                 \x20   <Computer>{computer}</Computer>\n\
                 \x20   <Submitted>{submitted}</Submitted>\n\
                 \x20   <Description>{description}</Description>\n\
                 \x20   <LastUpdated>{last_updated}</LastUpdated>\n\
                 \x20 </JobInfo>\n\
                 \x20 <JobFlags>\n\
                 \x20   <Active>{active}</Active>\n\
                 \x20   <Complete>{complete}</Complete>\n\
                 \x20 </JobFlags>\n\
                 {output_tag}\
                 </Job>\n\
                 </JobDescription>\n",
                name = name,
                computer = self.computer,
                submitted = self.submitted,
                description = self.description,
                last_updated = self.last_updated,
                active = self.active,
                complete = self.complete,
                output_tag = output_tag,
            );
            std::fs::write(job_dir.join("job.xml"), xml).unwrap();
        }

        if self.with_log {
            std::fs::write(job_dir.join("render.txt"), &self.log).unwrap();
        }

        output_dir
    }
}
