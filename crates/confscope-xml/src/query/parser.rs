use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char as pchar, digit0, digit1, multispace0, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, success, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

use super::{Axis, CompareOp, Expr, Function, LocationPath, NodeTest, Step};

pub(super) fn parse_query(text: &str) -> Result<Expr, String> {
    match all_consuming(delimited(multispace0, expr, multispace0))(text) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(err)) | Err(nom::Err::Failure(err)) => {
            if err.input.is_empty() {
                Err("unexpected end of query".to_string())
            } else {
                Err(format!("unexpected input at `{}`", err.input))
            }
        }
        Err(nom::Err::Incomplete(_)) => Err("unexpected end of query".to_string()),
    }
}

// ============================================================================
// Expressions
// ============================================================================

fn expr(input: &str) -> IResult<&str, Expr> {
    or_expr(input)
}

fn or_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(keyword("or"), and_expr))(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |acc, next| Expr::Or(Box::new(acc), Box::new(next))),
    ))
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = comparison_expr(input)?;
    let (input, rest) = many0(preceded(keyword("and"), comparison_expr))(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |acc, next| Expr::And(Box::new(acc), Box::new(next))),
    ))
}

fn comparison_expr(input: &str) -> IResult<&str, Expr> {
    let (input, left) = union_expr(input)?;
    let (input, tail) = opt(pair(
        delimited(multispace0, compare_op, multispace0),
        union_expr,
    ))(input)?;
    let expr = match tail {
        Some((op, right)) => Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        None => left,
    };
    Ok((input, expr))
}

fn compare_op(input: &str) -> IResult<&str, CompareOp> {
    alt((
        value(CompareOp::Ne, tag("!=")),
        value(CompareOp::Le, tag("<=")),
        value(CompareOp::Ge, tag(">=")),
        value(CompareOp::Eq, tag("=")),
        value(CompareOp::Lt, tag("<")),
        value(CompareOp::Gt, tag(">")),
    ))(input)
}

fn union_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = primary(input)?;
    let (input, rest) = many0(preceded(
        delimited(multispace0, pchar('|'), multispace0),
        primary,
    ))(input)?;
    if rest.is_empty() {
        return Ok((input, first));
    }
    let mut members = vec![first];
    members.extend(rest);
    Ok((input, Expr::Union(members)))
}

fn primary(input: &str) -> IResult<&str, Expr> {
    preceded(
        multispace0,
        alt((
            map(string_literal, Expr::Literal),
            map(number, Expr::Number),
            function_call,
            delimited(
                pair(pchar('('), multispace0),
                expr,
                pair(multispace0, pchar(')')),
            ),
            map(location_path, Expr::Path),
        )),
    )(input)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    delimited(
        multispace0,
        terminated(tag(word), not(satisfy(is_name_char))),
        multispace0,
    )
}

fn string_literal(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(pchar('\''), take_while(|c: char| c != '\''), pchar('\'')),
            delimited(pchar('"'), take_while(|c: char| c != '"'), pchar('"')),
        )),
        str::to_string,
    )(input)
}

fn number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(pair(digit1, opt(pair(pchar('.'), digit0)))),
        |digits: &str| digits.parse::<f64>(),
    )(input)
}

fn function_call(input: &str) -> IResult<&str, Expr> {
    let (input, function) = alt((
        value(Function::StartsWith, tag("starts-with")),
        value(Function::Contains, tag("contains")),
        value(Function::Position, tag("position")),
        value(Function::Count, tag("count")),
        value(Function::Last, tag("last")),
        value(Function::Not, tag("not")),
    ))(input)?;
    let (input, _) = pair(multispace0, pchar('('))(input)?;
    let (input, args) = separated_list0(pchar(','), delimited(multispace0, expr, multispace0))(input)?;
    let (input, _) = pair(multispace0, pchar(')'))(input)?;
    Ok((input, Expr::Call { function, args }))
}

// ============================================================================
// Location paths
// ============================================================================

fn location_path(input: &str) -> IResult<&str, LocationPath> {
    alt((
        map(preceded(tag("//"), relative_steps), |mut steps| {
            steps.insert(0, Step::descendant_or_self());
            LocationPath {
                absolute: true,
                steps,
            }
        }),
        map(preceded(pchar('/'), opt(relative_steps)), |steps| {
            LocationPath {
                absolute: true,
                steps: steps.unwrap_or_default(),
            }
        }),
        map(relative_steps, |steps| LocationPath {
            absolute: false,
            steps,
        }),
    ))(input)
}

fn relative_steps(input: &str) -> IResult<&str, Vec<Step>> {
    let (mut input, first) = step(input)?;
    let mut steps = vec![first];
    loop {
        if let Ok((rest, next)) = preceded(tag("//"), step)(input) {
            steps.push(Step::descendant_or_self());
            steps.push(next);
            input = rest;
        } else if let Ok((rest, next)) = preceded(pchar('/'), step)(input) {
            steps.push(next);
            input = rest;
        } else {
            break;
        }
    }
    Ok((input, steps))
}

fn step(input: &str) -> IResult<&str, Step> {
    alt((
        value(Step::new(Axis::Parent, NodeTest::Node), tag("..")),
        value(Step::new(Axis::SelfAxis, NodeTest::Node), tag(".")),
        axis_step,
    ))(input)
}

fn axis_step(input: &str) -> IResult<&str, Step> {
    let (input, axis) = axis_specifier(input)?;
    let (input, test) = node_test(input)?;
    let (input, predicates) = many0(predicate)(input)?;
    Ok((
        input,
        Step {
            axis,
            test,
            predicates,
        },
    ))
}

fn axis_specifier(input: &str) -> IResult<&str, Axis> {
    alt((
        value(Axis::Attribute, pchar('@')),
        terminated(axis_name, tag("::")),
        success(Axis::Child),
    ))(input)
}

fn axis_name(input: &str) -> IResult<&str, Axis> {
    alt((
        value(Axis::DescendantOrSelf, tag("descendant-or-self")),
        value(Axis::Descendant, tag("descendant")),
        value(Axis::Attribute, tag("attribute")),
        value(Axis::Child, tag("child")),
        value(Axis::Parent, tag("parent")),
        value(Axis::SelfAxis, tag("self")),
    ))(input)
}

fn node_test(input: &str) -> IResult<&str, NodeTest> {
    alt((
        value(NodeTest::Node, tag("node()")),
        value(NodeTest::Text, tag("text()")),
        value(NodeTest::Comment, tag("comment()")),
        value(NodeTest::AnyName, pchar('*')),
        map(terminated(ncname, tag(":*")), |prefix| {
            NodeTest::NamespaceWildcard {
                prefix: prefix.to_string(),
                uri: String::new(),
            }
        }),
        map(pair(ncname, opt(preceded(pchar(':'), ncname))), |(first, second)| {
            match second {
                Some(local) => NodeTest::Name {
                    prefix: Some(first.to_string()),
                    local: local.to_string(),
                    uri: None,
                },
                None => NodeTest::Name {
                    prefix: None,
                    local: first.to_string(),
                    uri: None,
                },
            }
        }),
    ))(input)
}

fn predicate(input: &str) -> IResult<&str, Expr> {
    delimited(
        pair(pchar('['), multispace0),
        expr,
        pair(multispace0, pchar(']')),
    )(input)
}

fn ncname(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_name_char),
    ))(input)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}
