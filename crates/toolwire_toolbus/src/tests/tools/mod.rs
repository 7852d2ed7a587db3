mod bash;
mod builtin;
mod delay;
mod echo;
