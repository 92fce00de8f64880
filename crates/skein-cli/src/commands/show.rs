use std::process;

pub fn run(data: String, json: bool) {
    let document = skein_core::load_or_default(&data);

    if json {
        match serde_json::to_string_pretty(&document) {
            Ok(body) => println!("{body}"),
            Err(e) => {
                eprintln!("error: snapshot failed to serialize: {e}");
                process::exit(1);
            }
        }
        return;
    }

    println!(
        "{} issues (lastId={})",
        document.issues.len(),
        document.last_id
    );
    for issue in &document.issues {
        println!(
            "  #{} [{}] {} (by {}, {} comments)",
            issue.id,
            issue.status,
            issue.title,
            issue.created_by,
            issue.comments.len()
        );
    }
}
