//! Human-in-the-loop input channel and the action roleplay lines.
//!
//! The session is generic over [`HumanChannel`] so tests can script the
//! interaction; [`StdioChannel`] is the interactive terminal implementation.

use std::io::{BufRead, Write};

use crate::error::{SessionError, SessionResult};

/// Blocking human input: pick one option from a list, or confirm a result.
pub trait HumanChannel {
    /// Present `options` and return the index the human picked.
    fn choose(&mut self, prompt: &str, options: &[String]) -> SessionResult<usize>;

    /// Yes/no confirmation of a proposed result.
    fn confirm(&mut self, prompt: &str) -> SessionResult<bool>;
}

/// Interactive channel over stdin/stdout. Invalid input reprompts; a closed
/// stdin surfaces as [`SessionError::ChannelClosed`].
#[derive(Debug, Default)]
pub struct StdioChannel;

impl StdioChannel {
    pub fn new() -> Self {
        Self
    }

    fn read_line(&self) -> SessionResult<String> {
        let mut line = String::new();
        let bytes = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|_| SessionError::ChannelClosed)?;
        if bytes == 0 {
            return Err(SessionError::ChannelClosed);
        }
        Ok(line.trim().to_string())
    }
}

impl HumanChannel for StdioChannel {
    fn choose(&mut self, prompt: &str, options: &[String]) -> SessionResult<usize> {
        println!("{prompt}");
        println!("Possible options:");
        for (i, option) in options.iter().enumerate() {
            println!("{i} - {option}");
        }
        loop {
            print!("Choose one of the above that suits you (put an appropriate ID): ");
            let _ = std::io::stdout().flush();
            let line = self.read_line()?;
            match line.parse::<usize>() {
                Ok(index) if index < options.len() => {
                    println!("Answer affirmative...\n");
                    return Ok(index);
                }
                _ => println!("WARNING: Invalid input detected! Please try again!"),
            }
        }
    }

    fn confirm(&mut self, prompt: &str) -> SessionResult<bool> {
        loop {
            print!("{prompt} Yes (Y) / No (N): ");
            let _ = std::io::stdout().flush();
            match self.read_line()?.to_uppercase().as_str() {
                "Y" => return Ok(true),
                "N" => return Ok(false),
                _ => println!("WARNING: Invalid input detected! Please try again!"),
            }
        }
    }
}

/// The in-character line performed for a resolved action.
pub fn prompt_line(action: &str) -> String {
    match action {
        "Verbal_greeting" => "'Hello to you human. It is good to see you.'".into(),
        "Telling_a_joke" => "'Why did the chicken cross the road?'".into(),
        "Getting_closer" => "*Comes closer to the user*".into(),
        "Hand_wave" => "*Waves hand at the user to draw their attention*".into(),
        "Staying_quiet" => "*Decides not to do anything*".into(),
        "Thumb_up" => "*Shows the 'thumbs up' gesture*".into(),
        "User_comforting" => {
            "'Please, do not worry, human. Everything is going to be alright.'".into()
        }
        "Question_about_feeling" => {
            "'How do you feel today, human? Is everything alright?'".into()
        }
        "Friend_or_family_talk_recommendation" => {
            "'Maybe it would be a good idea to call your friend or family member?'".into()
        }
        "Doing_some_exercises" => {
            "'It is time for some exercises. Here is the plan for today...'".into()
        }
        "Going_for_a_walk" => {
            "'I recommend taking a walk and getting some fresh air.'".into()
        }
        "Ordering_some_food" => "'Initiating the food order sequence...'".into(),
        "Playing_some_games" => medium_line("play a game"),
        "Reading_a_book" => medium_line("read a book"),
        "Watching_a_movie" => medium_line("watch a movie"),
        other if other.contains("music") => {
            let playlist = other.replace('_', " ");
            format!("'Opening the '{playlist}' playlist. Now playing...'")
        }
        other => format!("*Performs the '{other}' action*"),
    }
}

fn medium_line(medium: &str) -> String {
    format!("'Maybe you'd like to {medium}? The pick for today is...'")
}
