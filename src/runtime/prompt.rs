use crate::error::Result;
use std::io::{stdin, stdout, Write};

/// List `names` on stdout and read a 1-based choice from stdin. An empty or
/// unparsable answer picks the first entry; `None` means out of range.
pub fn prompt_choice(heading: &str, names: &[String]) -> Result<Option<usize>> {
    println!("{heading}:");
    for (i, name) in names.iter().enumerate() {
        println!("{}. {}", i + 1, name);
    }
    print!("Select (default 1): ");
    stdout().flush()?;

    let mut answer = String::new();
    stdin().read_line(&mut answer)?;
    Ok(parse_choice(&answer, names.len()))
}

fn parse_choice(answer: &str, len: usize) -> Option<usize> {
    let index = answer.trim().parse::<usize>().unwrap_or(1).checked_sub(1)?;
    (index < len).then_some(index)
}

/// Index of the first name containing `pattern`, ignoring case.
pub fn find_by_name(names: &[String], pattern: &str) -> Option<usize> {
    let pattern = pattern.to_lowercase();
    names
        .iter()
        .position(|name| name.to_lowercase().contains(&pattern))
}
