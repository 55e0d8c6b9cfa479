use crate::model::Value;
use crate::transpiler::errors::ScriptError;
use crate::transpiler::script::syntax::{BinaryOp, Expr, Place, Program, Stmt, UnaryOp};
use std::cell::Cell;

/// Deepest nesting of brackets, blocks, unary operators and ternaries.
pub const MAX_NESTING: usize = 64;

/// Most binary operators one script may contain.
pub const MAX_OPERATORS: usize = 2048;

/// Longest run of `.name`, `[index]` and `(args)` after one atom.
pub const MAX_POSTFIX_CHAIN: usize = 256;

/// Counters threaded through one parse so hostile input fails with an error
/// instead of exhausting the stack.
#[derive(Debug, Default)]
pub struct ParseLimits {
    depth: Cell<usize>,
    operators: Cell<usize>,
}

impl ParseLimits {
    fn enter(&self) -> Result<(), &'static str> {
        let depth = self.depth.get();
        if depth >= MAX_NESTING {
            return Err("shallower nesting");
        }
        self.depth.set(depth + 1);
        Ok(())
    }

    fn leave(&self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }

    // Past the budget the parse only needs to finish, so the chain is cut.
    fn binary(&self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        let count = self.operators.get() + 1;
        self.operators.set(count);
        if count > MAX_OPERATORS {
            Expr::Literal(Value::Undefined)
        } else {
            Expr::binary(op, left, right)
        }
    }
}

enum PostfixOp {
    Member(String),
    Index(Expr),
    Call(Vec<Expr>),
}

impl PostfixOp {
    fn apply(base: Expr, op: PostfixOp) -> Expr {
        match op {
            PostfixOp::Member(name) => Expr::Member(Box::new(base), name),
            PostfixOp::Index(index) => Expr::Index(Box::new(base), Box::new(index)),
            PostfixOp::Call(args) => Expr::Call(Box::new(base), args),
        }
    }
}

fn compound_assign(target: Expr, op: &str, value: Expr) -> Option<Stmt> {
    let op = match op {
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        _ => return None,
    };
    let place = Place::from_expr(target.clone())?;
    Some(Stmt::Assign(place, Expr::binary(op, target, value)))
}

peg::parser! {
    grammar script_parser(limits: &ParseLimits) for str {
        // Whitespace and // comments
        rule _() = quiet!{ ([' ' | '\t' | '\n' | '\r'] / "//" [^ '\n']*)* }

        rule enter() = position!() {? limits.enter() }
        rule leave() = position!() { limits.leave() }

        // Runs `r` one nesting level deeper; fails past the limit.
        rule nested<T>(r: rule<T>) -> T
            = enter() v:r()? leave() {? v.ok_or("nested expression") }

        rule ident_start() = ['a'..='z' | 'A'..='Z' | '_' | '$']
        rule ident_char() = ['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '$']

        rule keyword()
            = ("let" / "if" / "else" / "for" / "in" / "true" / "false" / "null" / "undefined")
              !ident_char()

        rule name() -> String
            = quiet!{ !keyword() n:$(ident_start() ident_char()*) { n.to_string() } }
            / expected!("identifier")

        // Member names may reuse keywords: `node.in`, `node.for`
        rule property_name() -> String
            = n:$(ident_start() ident_char()*) { n.to_string() }

        rule digits() = ['0'..='9']+

        rule number() -> f64
            = n:$((digits() ("." digits())? / "." digits()) (['e' | 'E'] ['+' | '-']? digits())?) {?
                n.parse().or(Err("number"))
            }

        rule escape() -> char
            = "n" { '\n' }
            / "t" { '\t' }
            / "r" { '\r' }
            / "0" { '\0' }
            / c:[_] { c }

        rule dq_char() -> char
            = "\\" c:escape() { c }
            / c:[^ '"' | '\\'] { c }

        rule sq_char() -> char
            = "\\" c:escape() { c }
            / c:[^ '\'' | '\\'] { c }

        rule string() -> String
            = "\"" chars:dq_char()* "\"" { chars.into_iter().collect() }
            / "'" chars:sq_char()* "'" { chars.into_iter().collect() }

        rule field() -> (String, Expr)
            = key:(property_name() / string()) _ ":" _ value:expr() { (key, value) }

        rule list_items() -> Vec<Expr>
            = items:(expr() ** (_ "," _)) _ ","? { items }

        rule object_fields() -> Vec<(String, Expr)>
            = fields:(field() ** (_ "," _)) _ ","? { fields }

        rule atom() -> Expr
            = n:number() { Expr::Literal(Value::Number(n)) }
            / s:string() { Expr::Literal(Value::String(s)) }
            / "true" !ident_char() { Expr::Literal(Value::Bool(true)) }
            / "false" !ident_char() { Expr::Literal(Value::Bool(false)) }
            / ("null" / "undefined") !ident_char() { Expr::Literal(Value::Undefined) }
            / "[" _ items:nested(<list_items()>) _ "]" { Expr::List(items) }
            / "{" _ fields:nested(<object_fields()>) _ "}" { Expr::Object(fields) }
            / "(" _ e:nested(<expr()>) _ ")" { e }
            / n:name() { Expr::Var(n) }

        rule postfix_op() -> PostfixOp
            = "." _ n:property_name() { PostfixOp::Member(n) }
            / "[" _ e:nested(<expr()>) _ "]" { PostfixOp::Index(e) }
            / "(" _ args:nested(<list_items()>) _ ")" { PostfixOp::Call(args) }

        rule postfix() -> Expr
            = base:atom() ops:(_ op:postfix_op() { op })* {?
                if ops.len() > MAX_POSTFIX_CHAIN {
                    Err("shorter member chain")
                } else {
                    Ok(ops.into_iter().fold(base, PostfixOp::apply))
                }
            }

        rule unary() -> Expr
            = "!" _ x:nested(<unary()>) { Expr::unary(UnaryOp::Not, x) }
            / "-" _ x:nested(<unary()>) { Expr::unary(UnaryOp::Neg, x) }
            / postfix()

        rule binary() -> Expr = precedence!{
            x:(@) _ "||" _ y:@ { limits.binary(BinaryOp::Or, x, y) }
            --
            x:(@) _ "&&" _ y:@ { limits.binary(BinaryOp::And, x, y) }
            --
            x:(@) _ "==" "="? _ y:@ { limits.binary(BinaryOp::Eq, x, y) }
            x:(@) _ "!=" "="? _ y:@ { limits.binary(BinaryOp::NotEq, x, y) }
            --
            x:(@) _ "<=" _ y:@ { limits.binary(BinaryOp::LtEq, x, y) }
            x:(@) _ ">=" _ y:@ { limits.binary(BinaryOp::GtEq, x, y) }
            x:(@) _ "<" _ y:@ { limits.binary(BinaryOp::Lt, x, y) }
            x:(@) _ ">" _ y:@ { limits.binary(BinaryOp::Gt, x, y) }
            --
            x:(@) _ "+" !"=" _ y:@ { limits.binary(BinaryOp::Add, x, y) }
            x:(@) _ "-" !"=" _ y:@ { limits.binary(BinaryOp::Sub, x, y) }
            --
            x:(@) _ "*" !"=" _ y:@ { limits.binary(BinaryOp::Mul, x, y) }
            x:(@) _ "/" !['=' | '/'] _ y:@ { limits.binary(BinaryOp::Div, x, y) }
            x:(@) _ "%" _ y:@ { limits.binary(BinaryOp::Rem, x, y) }
            --
            u:unary() { u }
        }

        rule expr() -> Expr
            = c:binary() branches:(_ "?" _ a:nested(<expr()>) _ ":" _ b:nested(<expr()>) { (a, b) })? {
                match branches {
                    Some((a, b)) => Expr::Cond(Box::new(c), Box::new(a), Box::new(b)),
                    None => c,
                }
            }

        rule block() -> Vec<Stmt>
            = "{" _ body:nested(<statements()>) _ "}" { body }

        rule if_statement() -> Stmt
            = "if" !ident_char() _ c:expr() _ then:block()
              otherwise:(_ "else" !ident_char() _ e:else_branch() { e })? {
                Stmt::If(c, then, otherwise.unwrap_or_default())
            }

        rule else_branch() -> Vec<Stmt>
            = s:nested(<if_statement()>) { vec![s] }
            / block()

        rule declaration() = ("let" / "const" / "var") !ident_char()

        rule statement() -> Stmt
            = declaration() _ n:name() _ "=" !"=" _ e:expr() { Stmt::Let(n, e) }
            / if_statement()
            / "for" !ident_char() _ "("? _ (declaration() _)? v:name() _
              ("in" / "of") !ident_char() _ e:expr() _ ")"? _ body:block() {
                Stmt::For(v, e, body)
            }
            / "@text" _ "(" _ n:$(['0'..='9']+) _ ")" {? n.parse().map(Stmt::Chunk).or(Err("chunk index")) }
            / "@emit" _ "(" _ e:expr() _ ")" { Stmt::Emit(e) }
            / t:postfix() _ "=" !"=" _ e:expr() {?
                Place::from_expr(t).map(|p| Stmt::Assign(p, e)).ok_or("assignable target")
            }
            / t:postfix() _ op:$(['+' | '-' | '*' | '/']) "=" _ e:expr() {?
                compound_assign(t, op, e).ok_or("assignable target")
            }
            / e:expr() { Stmt::Expr(e) }

        rule statement_item() -> Option<Stmt>
            = ";" { None }
            / s:statement() { Some(s) }

        rule statements() -> Vec<Stmt>
            = items:(statement_item() ** _) { items.into_iter().flatten().collect() }

        pub rule program() -> Program
            = _ body:statements() _ { body }

        pub rule expression() -> Expr
            = _ e:expr() _ { e }
    }
}

fn syntax_error(e: peg::error::ParseError<peg::str::LineCol>) -> ScriptError {
    ScriptError::Syntax {
        line: e.location.line,
        column: e.location.column,
        expected: e.expected.to_string(),
    }
}

fn parse_limited<T, F>(source: &str, rule: F) -> Result<T, ScriptError>
where
    F: FnOnce(&str, &ParseLimits) -> Result<T, peg::error::ParseError<peg::str::LineCol>>,
{
    let limits = ParseLimits::default();
    let parsed = rule(source, &limits).map_err(syntax_error)?;
    if limits.operators.get() > MAX_OPERATORS {
        return Err(ScriptError::TooManyOperators(MAX_OPERATORS));
    }
    Ok(parsed)
}

/// Parses a statement block (selector body or rewritten template).
pub fn parse_program(source: &str) -> Result<Program, ScriptError> {
    parse_limited(source, |text, limits| script_parser::program(text, limits))
}

pub fn parse_expression(source: &str) -> Result<Expr, ScriptError> {
    parse_limited(source, |text, limits| script_parser::expression(text, limits))
}
