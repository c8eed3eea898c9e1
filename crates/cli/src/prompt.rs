//! Interactive questions on the terminal

use std::collections::HashMap;
use std::io::{self, BufRead, Write};

/// Ask one question and return the trimmed answer; `None` at end of input
pub fn ask<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> io::Result<Option<String>> {
    write!(out, "{} ", question)?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Yes/no question; anything but an explicit yes is a no
pub fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> io::Result<bool> {
    let answer = ask(input, out, &format!("{} [y/N]", question))?.unwrap_or_default();
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes" | "j" | "ja"))
}

/// Collect a tester name for every file not already named in `given`.
///
/// Returns `None` when the user leaves a name empty, which cancels the
/// whole assignment.
pub fn tester_names<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    filenames: &[String],
    mut given: HashMap<String, String>,
) -> io::Result<Option<HashMap<String, String>>> {
    let open: Vec<&String> = filenames
        .iter()
        .filter(|f| given.get(*f).map_or(true, |n| n.trim().is_empty()))
        .collect();
    if !open.is_empty() {
        writeln!(out, "{} report file(s) do not name their tester.", open.len())?;
    }
    for filename in open {
        match ask(input, out, &format!("Tester name for {} (empty cancels):", filename))? {
            Some(name) if !name.is_empty() => {
                given.insert(filename.clone(), name);
            }
            _ => return Ok(None),
        }
    }
    Ok(Some(given))
}

/// Interactive prompts on the process's stdin/stdout
pub fn stdin_tester_names(
    filenames: &[String],
    given: HashMap<String, String>,
) -> io::Result<Option<HashMap<String, String>>> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    tester_names(&mut input, &mut io::stdout(), filenames, given)
}

pub fn stdin_confirm(question: &str) -> io::Result<bool> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    confirm(&mut input, &mut io::stdout(), question)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_confirm() {
        for (answer, expected) in [("y\n", true), ("Ja\n", true), ("n\n", false), ("", false)] {
            let mut out = Vec::new();
            assert_eq!(confirm(&mut Cursor::new(answer), &mut out, "Replace?").unwrap(), expected);
            assert!(String::from_utf8(out).unwrap().contains("[y/N]"));
        }
    }

    #[test]
    fn test_only_unnamed_files_are_asked() {
        let files = vec!["a.json".to_string(), "b.json".to_string()];
        let given: HashMap<_, _> = [("a.json".to_string(), "Ann".to_string())].into();
        let mut out = Vec::new();
        let names = tester_names(&mut Cursor::new(" Ben \n"), &mut out, &files, given)
            .unwrap()
            .unwrap();
        assert_eq!(names["a.json"], "Ann");
        assert_eq!(names["b.json"], "Ben");
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("b.json"));
        assert!(!printed.contains("a.json"));
    }

    #[test]
    fn test_empty_answer_cancels() {
        let files = vec!["a.json".to_string()];
        let mut out = Vec::new();
        let names = tester_names(&mut Cursor::new("\n"), &mut out, &files, HashMap::new()).unwrap();
        assert!(names.is_none());
    }
}
