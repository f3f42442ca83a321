pub mod land;
pub mod records;
pub mod review;
pub mod rollback;
pub mod stats;

use lander_core::CommitRecord;

/// Multi-line summary shared by commands that return a record.
pub fn print_record(record: &CommitRecord) {
    println!("Record:   {}", record.id);
    println!("  Fix:      {}", record.fix_id);
    println!("  Strategy: {}", record.strategy);
    println!("  Status:   {}", record.status);
    if !record.branch.is_empty() {
        println!("  Branch:   {} -> {}", record.branch, record.base_branch);
    }
    if let Some(hash) = &record.commit_hash {
        println!("  Commit:   {}", hash);
    }
    if let (Some(number), Some(url)) = (record.pr_number, &record.pr_url) {
        println!("  Review:   #{} {}", number, url);
    }
    if !record.title.is_empty() {
        println!("  Title:    {}", record.title);
    }
    if let Some(info) = &record.rollback_info {
        println!(
            "  Reverted: {} by {} ({})",
            info.original_commit, info.rollback_commit, info.reason
        );
    }
    if let lander_core::CommitStatus::Failed { reason } = &record.status {
        println!("  Reason:   {}", reason);
    }
}
