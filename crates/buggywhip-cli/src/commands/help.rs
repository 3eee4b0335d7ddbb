/// Command names offered by completion, in help order.
pub const COMMAND_NAMES: &[&str] = &[
    "help",
    "exit",
    "load",
    "list",
    "run",
    "do",
    "step",
    "next",
    "breakpoint",
];

pub const HELP_TEXT: &str = "\
List of classes of commands:

help -- Print list of commands
exit -- Exit buggywhip
load -- Load source
list -- List source from specified line or keyword
run -- Start debugged script
do -- Send one command line to the shell
step -- Step program line by line
next -- Step program until it reaches a breakpoint
breakpoint -- Manage breakpoints
";
