/// Command palette entries and autocomplete ranking

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

pub const COMMANDS: &[Command] = &[
  Command {
    name: "jobs",
    aliases: &["j", "refresh", "reload"],
    description: "Refetch the job list",
  },
  Command {
    name: "export",
    aliases: &["x", "csv"],
    description: "Export selected rows to CSV",
  },
  Command {
    name: "template",
    aliases: &["t", "tpl"],
    description: "Download the blank candidate template",
  },
  Command {
    name: "upload",
    aliases: &["u", "bulk", "import"],
    description: "Bulk upload candidates for the current row",
  },
  Command {
    name: "description",
    aliases: &["d", "jd"],
    description: "Save the current row's job description",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit jobdesk",
  },
];

/// Rank of a command for the given (lowercased) input; lower is better.
fn match_rank(cmd: &Command, input: &str) -> Option<u8> {
  if cmd.name == input {
    Some(0)
  } else if cmd.aliases.contains(&input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if cmd.aliases.iter().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
}

/// Commands matching the input, best match first
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();
  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&'static Command, u8)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_rank(cmd, &input).map(|rank| (cmd, rank)))
    .collect();

  // Stable sort keeps declaration order within a rank
  matches.sort_by_key(|(_, rank)| *rank);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    assert_eq!(get_suggestions("").len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    assert_eq!(get_suggestions("export")[0].name, "export");
  }

  #[test]
  fn test_alias_match() {
    assert_eq!(get_suggestions("bulk")[0].name, "upload");
    assert_eq!(get_suggestions("jd")[0].name, "description");
  }

  #[test]
  fn test_prefix_match() {
    assert_eq!(get_suggestions("tem")[0].name, "template");
  }

  #[test]
  fn test_fuzzy_match() {
    assert_eq!(get_suggestions("plat")[0].name, "template");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }
}
