//! `-r CMD ARGS...` token stream codec.

use std::borrow::Cow;
use std::fmt;

use crate::error::DecodeError;

/// Token that opens a new command.
pub const RUN_FLAG: &str = "-r";

/// Escaped form of a literal `-r` argument.
pub const ESCAPED_RUN_FLAG: &str = "\\-r";

/// A single command: resolved executable followed by its arguments.
///
/// Built once by [`decode`] and consumed once when spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    argv: Vec<String>,
}

impl CommandSpec {
    /// Build a spec from an argv without resolving or expanding anything.
    ///
    /// Returns `None` for an empty argv.
    pub fn from_argv(argv: Vec<String>) -> Option<Self> {
        if argv.is_empty() {
            return None;
        }
        Some(Self { argv })
    }

    /// The executable path.
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// Arguments after the executable.
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    /// Full argv, executable first.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn into_argv(self) -> Vec<String> {
        self.argv
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.argv)
    }
}

/// Ordered commands parsed from one invocation or one socket payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandGroup {
    commands: Vec<CommandSpec>,
}

impl CommandGroup {
    pub fn new(commands: Vec<CommandSpec>) -> Self {
        Self { commands }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CommandSpec> {
        self.commands.iter()
    }
}

impl IntoIterator for CommandGroup {
    type Item = CommandSpec;
    type IntoIter = std::vec::IntoIter<CommandSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

impl<'a> IntoIterator for &'a CommandGroup {
    type Item = &'a CommandSpec;
    type IntoIter = std::slice::Iter<'a, CommandSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

impl FromIterator<CommandSpec> for CommandGroup {
    fn from_iter<T: IntoIterator<Item = CommandSpec>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Result of decoding a token stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Commands in the order they were given.
    pub commands: CommandGroup,
    /// Tokens that preceded the first `-r`, left for flag parsing.
    pub flags: Vec<String>,
}

/// Decode a token stream into commands and leftover flags.
///
/// Each `-r` opens a new command; the token after it is looked up in `PATH`.
/// Remaining tokens up to the next `-r` are arguments, expanded for
/// environment references. `\-r` stands for a literal `-r` argument.
///
/// This is the command line form. The output of [`encode`] carries final
/// values and is read back with [`split`].
pub fn decode<I, S>(tokens: I) -> Result<Decoded, DecodeError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut decoded = Decoded::default();
    let mut commands = Vec::new();
    for group in groups(tokens, &mut decoded.flags)? {
        let mut group = group.into_iter();
        let Some(target) = group.next() else {
            continue;
        };
        let mut argv = vec![resolve(&expand_env(&target))?];
        argv.extend(group.map(|token| match unescape(&token) {
            Some(literal) => literal.to_string(),
            None => expand_env(&token).into_owned(),
        }));
        commands.push(CommandSpec { argv });
    }
    decoded.commands = CommandGroup::new(commands);
    Ok(decoded)
}

/// Split a token stream produced by [`encode`] back into commands.
///
/// Nothing is expanded or resolved: the arguments are taken as the final
/// values they were encoded from. Escaped arguments are unescaped, so
/// `split(encode(group))` gives back `group`.
pub fn split<I, S>(tokens: I) -> Result<Decoded, DecodeError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut decoded = Decoded::default();
    let commands = groups(tokens, &mut decoded.flags)?
        .into_iter()
        .filter_map(|group| {
            let argv = group
                .into_iter()
                .enumerate()
                .map(|(index, token)| match unescape(&token) {
                    Some(literal) if index > 0 => literal.to_string(),
                    _ => token,
                })
                .collect();
            CommandSpec::from_argv(argv)
        })
        .collect();
    decoded.commands = commands;
    Ok(decoded)
}

/// Encode commands into a token stream [`split`] reads back unchanged.
///
/// A literal `-r` argument becomes `\-r`; an argument that already looks
/// escaped gains one more backslash.
pub fn encode(group: &CommandGroup) -> Vec<String> {
    let mut tokens = Vec::new();
    for spec in group {
        tokens.push(RUN_FLAG.to_string());
        tokens.push(spec.program().to_string());
        for arg in spec.args() {
            if arg.trim_start_matches('\\') == RUN_FLAG {
                tokens.push(format!("\\{arg}"));
            } else {
                tokens.push(arg.clone());
            }
        }
    }
    tokens
}

/// Raw `-r` groups, the executable token first. Tokens before the first
/// `-r` go to `flags`.
fn groups<I, S>(tokens: I, flags: &mut Vec<String>) -> Result<Vec<Vec<String>>, DecodeError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut tokens = tokens.into_iter().map(Into::into);
    let mut groups: Vec<Vec<String>> = Vec::new();

    while let Some(token) = tokens.next() {
        if token == RUN_FLAG {
            let target = tokens.next().ok_or(DecodeError::MissingCommand)?;
            groups.push(vec![target]);
            continue;
        }
        match groups.last_mut() {
            Some(group) => group.push(token),
            None => flags.push(token),
        }
    }
    Ok(groups)
}

/// Strip one backslash from an escaped `-r` (`\-r`, `\\-r`, ...).
fn unescape(token: &str) -> Option<&str> {
    let literal = token.strip_prefix('\\')?;
    (literal.trim_start_matches('\\') == RUN_FLAG).then_some(literal)
}

/// Expand `$NAME` and `${NAME}` references. Unset variables expand to "".
pub fn expand_env(token: &str) -> Cow<'_, str> {
    shellexpand::env_with_context_no_errors(token, |name| {
        Some(std::env::var(name).unwrap_or_default())
    })
}

/// Look up the executable of `spec` in `PATH`.
///
/// Used for commands that arrive through [`split`], which leaves the
/// executable as it was sent.
pub fn resolve_program(spec: CommandSpec) -> Result<CommandSpec, DecodeError> {
    let mut argv = spec.into_argv();
    argv[0] = resolve(&argv[0])?;
    Ok(CommandSpec { argv })
}

fn resolve(target: &str) -> Result<String, DecodeError> {
    let path = which::which(target).map_err(|source| {
        DecodeError::Unresolvable {
            command: target.to_string(),
            source,
        }
    })?;
    path.into_os_string()
        .into_string()
        .map_err(|raw| DecodeError::NonUtf8Path(raw.into()))
}
